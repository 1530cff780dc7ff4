use std::ops::{Deref, DerefMut};

pub(crate) trait NullCheck {
    fn is_null(&self) -> bool;
}

impl<T> NullCheck for *mut T {
    fn is_null(&self) -> bool {
        (*self as *const T).is_null()
    }
}

/// Owned C handle, released through `dealloc` unless null.
#[derive(Debug)]
pub(crate) struct CBox<T: NullCheck> {
    pub(crate) ptr: T,
    dealloc: fn(T),
}

impl<T: NullCheck> CBox<T> {
    pub fn new(ptr: T, dealloc: fn(T)) -> Self {
        Self { ptr, dealloc }
    }
}

impl<T: NullCheck> Drop for CBox<T> {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            unsafe {
                (self.dealloc)(std::ptr::read(&self.ptr as *const T));
            }
        }
    }
}

impl<T: NullCheck> Deref for CBox<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.ptr
    }
}

impl<T: NullCheck> DerefMut for CBox<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.ptr
    }
}

unsafe impl<T: NullCheck> Send for CBox<T> {}
unsafe impl<T: NullCheck> Sync for CBox<T> {}

#[cfg(test)]
mod tests {
    use crate::cbox::CBox;
    use std::{
        ptr,
        sync::atomic::{AtomicUsize, Ordering},
    };

    static DESTROYED: AtomicUsize = AtomicUsize::new(0);

    #[test]
    fn cbox_raw_pointer() {
        let mut v = 123;
        {
            let ptr = CBox::new(ptr::null_mut::<i32>(), |_| {
                DESTROYED.fetch_add(1, Ordering::Relaxed);
            });
            assert!(ptr.is_null());
        }
        assert_eq!(DESTROYED.load(Ordering::Relaxed), 0);
        {
            let ptr = CBox::new(&mut v as *mut i32, |_| {
                DESTROYED.fetch_add(1, Ordering::Relaxed);
            });
            assert_eq!(unsafe { **ptr }, 123);
        }
        assert_eq!(DESTROYED.load(Ordering::Relaxed), 1);
    }
}
