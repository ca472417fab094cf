/// Rounds the given size up to the allocator's 8-byte grain.
///
/// Every block size, header stride and payload address in the arena is a
/// multiple of 8, so this macro is applied to every caller-supplied size
/// before it touches block metadata.
///
/// # Examples
///
/// ```rust
/// use brkalloc::align8;
///
/// assert_eq!(align8!(0), 0);
/// assert_eq!(align8!(1), 8);
/// assert_eq!(align8!(8), 8);
/// assert_eq!(align8!(13), 16);
/// ```
#[macro_export]
macro_rules! align8 {
  ($value:expr) => {
    ($value + 7) & !7
  };
}
