use std::ops::{Deref, DerefMut};

/// Raw pointer types a [`CBox`] can own.
pub(crate) trait Handle: Copy {
    fn is_null(self) -> bool;
}

impl<T> Handle for *mut T {
    fn is_null(self) -> bool {
        <*mut T>::is_null(self)
    }
}

impl<T> Handle for *const T {
    fn is_null(self) -> bool {
        <*const T>::is_null(self)
    }
}

/// Owner of a handle returned by the SQLite C API (database or statement).
///
/// The handle is passed to `release` on drop, unless it is still null.
pub(crate) struct CBox<P: Handle> {
    pub(crate) ptr: P,
    release: fn(P),
}

impl<P: Handle> CBox<P> {
    pub(crate) fn new(ptr: P, release: fn(P)) -> Self {
        Self { ptr, release }
    }
}

impl<P: Handle> Drop for CBox<P> {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            (self.release)(self.ptr);
        }
    }
}

impl<P: Handle> Deref for CBox<P> {
    type Target = P;

    fn deref(&self) -> &P {
        &self.ptr
    }
}

impl<P: Handle> DerefMut for CBox<P> {
    fn deref_mut(&mut self) -> &mut P {
        &mut self.ptr
    }
}

// The bundled library runs in serialized mode, handles can cross threads.
unsafe impl<P: Handle> Send for CBox<P> {}
unsafe impl<P: Handle> Sync for CBox<P> {}

#[cfg(test)]
mod tests {
    use super::CBox;
    use std::{
        ptr,
        sync::atomic::{AtomicUsize, Ordering},
    };

    static RELEASED: AtomicUsize = AtomicUsize::new(0);

    fn release(_: *mut u8) {
        RELEASED.fetch_add(1, Ordering::Relaxed);
    }

    #[test]
    fn releases_only_non_null_handles() {
        let mut byte = 7u8;
        drop(CBox::new(ptr::null_mut::<u8>(), release));
        assert_eq!(RELEASED.load(Ordering::Relaxed), 0);
        {
            let mut handle = CBox::new(ptr::null_mut(), release);
            *handle = &mut byte as *mut u8;
            assert_eq!(unsafe { **handle }, 7);
            assert_eq!(RELEASED.load(Ordering::Relaxed), 0);
        }
        assert_eq!(RELEASED.load(Ordering::Relaxed), 1);
    }
}
