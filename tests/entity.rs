#[cfg(test)]
mod tests {
    use datalite::{
        AsValue, Entity, Identity, RowLabeled, Schema, StorageClass, Value, reconstruct,
        schema_of, serialize,
    };
    use std::sync::Arc;
    use time::macros::{date, datetime, time};
    use uuid::Uuid;

    #[derive(Entity, Debug, Clone, PartialEq)]
    #[datalite(name = "people")]
    struct Person {
        id: Identity,
        name: String,
        #[datalite(unique)]
        email: Option<String>,
        #[datalite(name = "years", default = 18)]
        age: u8,
        #[datalite(not_null)]
        nickname: Option<String>,
        #[datalite(skip)]
        cache: Vec<u8>,
    }

    #[derive(Entity, Debug, Clone, PartialEq)]
    struct EveryType {
        key: Identity,
        boolean: bool,
        int8: i8,
        int16: i16,
        int32: i32,
        int64: i64,
        uint8: u8,
        uint16: u16,
        uint32: u32,
        uint64: u64,
        float32: f32,
        float64: f64,
        string: String,
        bytes: Vec<u8>,
        date: time::Date,
        time: time::Time,
        timestamp: time::PrimitiveDateTime,
        uuid: Uuid,
        missing: Option<i32>,
    }

    #[derive(Entity)]
    struct Empty {
        _id: Identity,
    }

    #[test]
    fn descriptor() {
        assert_eq!(Person::table_name(), "people");
        let fields = Person::fields();
        assert_eq!(
            fields.iter().map(|v| v.name).collect::<Vec<_>>(),
            ["name", "email", "years", "nickname"]
        );
        assert!(matches!(fields[0].value, Value::Varchar(None)));
        assert!(!fields[0].nullable);
        assert!(fields[1].nullable && fields[1].unique);
        assert_eq!(fields[2].default, Some(Value::UInt8(Some(18))));
        assert!(fields[3].nullable && fields[3].not_null);
        assert_eq!(EveryType::table_name(), "every_type");
        assert!(Empty::fields().is_empty());
    }

    #[test]
    fn schema() {
        let schema = schema_of::<Person>().expect("Person is mappable");
        assert_eq!(schema.table, "people");
        assert_eq!(schema.columns.len(), 5);
        assert!(schema.columns[0].is_identity());
        let email = schema.column("email").unwrap();
        assert!(!email.nullable, "unique implies not null");
        assert!(email.unique);
        assert!(!schema.column("nickname").unwrap().nullable);
        assert_eq!(schema.column("years").unwrap().storage, StorageClass::Integer);
        assert!(std::ptr::eq(schema, Person::schema().unwrap()));
        assert_eq!(Schema::derive::<Person>().unwrap(), *schema);

        let schema = schema_of::<EveryType>().unwrap();
        let storage = schema
            .fields()
            .iter()
            .map(|v| v.storage)
            .collect::<Vec<_>>();
        use StorageClass::*;
        assert_eq!(
            storage,
            [
                Integer, Integer, Integer, Integer, Integer, Integer, Integer, Integer, Integer,
                Real, Real, Text, Blob, Text, Text, Text, Text, Integer
            ]
        );
    }

    #[test]
    fn identity_slot() {
        let mut person = Person {
            id: Identity::NONE,
            name: "Ada".into(),
            email: Some("ada@example.com".into()),
            age: 36,
            nickname: Some("countess".into()),
            cache: vec![1, 2, 3],
        };
        assert!(!person.identity().is_persisted());
        person.set_identity(Identity::new(4));
        assert_eq!(person.identity().get(), Some(4));
    }

    #[test]
    fn round_trip() {
        let value = EveryType {
            key: Identity::new(9),
            boolean: true,
            int8: -8,
            int16: -16_000,
            int32: i32::MIN,
            int64: i64::MAX,
            uint8: 255,
            uint16: 65_535,
            uint32: u32::MAX,
            uint64: 1 << 62,
            float32: 1.5,
            float64: -0.000_125,
            string: "it's \"quoted\" ✓".into(),
            bytes: vec![0, 1, 254, 255],
            date: date!(1815 - 12 - 10),
            time: time!(23:59:58.5),
            timestamp: datetime!(2024-02-29 12:30:01.25),
            uuid: Uuid::from_u128(0x1234_5678_9abc_def0_1234_5678_9abc_def0),
            missing: None,
        };
        let schema = schema_of::<EveryType>().unwrap();
        let labels: Arc<[String]> = schema.column_names().map(String::from).collect();
        let mut values = vec![Value::Int64(Some(9))];
        values.extend(serialize(&value).into_vec());
        let rebuilt: EveryType =
            reconstruct(schema, RowLabeled::new(labels, values.into_boxed_slice())).unwrap();
        assert_eq!(rebuilt, value);
    }

    #[test]
    fn rebuilt_from_store_representation() {
        // Values as the store hands them back: integers widened, temporal values as text
        let labels: Arc<[String]> = ["obj_id", "name", "email", "years", "nickname"]
            .into_iter()
            .map(String::from)
            .collect();
        let row = RowLabeled::new(
            labels,
            [
                Value::Int64(Some(3)),
                "Grace".to_string().as_value(),
                Value::Null,
                Value::Int64(Some(85)),
                Value::Varchar(Some("amazing".into())),
            ]
            .into(),
        );
        let person = reconstruct::<Person>(schema_of::<Person>().unwrap(), row).unwrap();
        assert_eq!(
            person,
            Person {
                id: Identity::new(3),
                name: "Grace".into(),
                email: None,
                age: 85,
                nickname: Some("amazing".into()),
                cache: vec![],
            }
        );

        let labels: Arc<[String]> = ["obj_id", "name"].into_iter().map(String::from).collect();
        let row = RowLabeled::new(labels, [Value::Int64(Some(3)), Value::Null].into());
        assert!(Person::from_row(row).is_err());
    }
}
