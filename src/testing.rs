//! Host-side stand-ins for memory mapped register blocks.

use crate::static_ref::StaticRef;

/// Leaks a zeroed, word-aligned allocation large enough for `T` and returns
/// it as a register block. Every test gets its own block.
pub fn fake_regs<T>() -> StaticRef<T> {
    let words = core::mem::size_of::<T>().div_ceil(4);
    let mem: &'static mut [u32] = Box::leak(vec![0u32; words].into_boxed_slice());
    // SAFETY: the allocation is leaked, so it lives for the rest of the test
    // process and nothing else refers to it.
    unsafe { StaticRef::new(mem.as_mut_ptr() as *const T) }
}

/// Reads the word at `offset` bytes into a fake register block, including
/// registers the driver can only write.
pub fn peek<T: 'static>(regs: StaticRef<T>, offset: usize) -> u32 {
    let base = &*regs as *const T as *const u8;
    // SAFETY: callers pass offsets inside the block allocated by `fake_regs`
    unsafe { core::ptr::read_volatile(base.add(offset) as *const u32) }
}

/// Stores a word into a fake register block, standing in for the hardware
/// setting status bits.
pub fn poke<T: 'static>(regs: StaticRef<T>, offset: usize, value: u32) {
    let base = &*regs as *const T as *mut u8;
    // SAFETY: as for `peek`
    unsafe { core::ptr::write_volatile(base.add(offset) as *mut u32, value) }
}
