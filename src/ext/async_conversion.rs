/// Async counterpart to the standard library's `TryFrom<T>` trait.
///
/// Used for conversions that have to touch the host filesystem first, such
/// as turning a path into the text it contains.
///
/// # Examples
///
/// ```rust,ignore
/// use std::path::Path;
///
/// struct Script(String);
///
/// impl AsyncTryFrom<&Path> for Script {
///     type Error = std::io::Error;
///
///     async fn async_try_from(path: &Path) -> Result<Self, Self::Error> {
///         let bytes = compio::fs::read(path).await?;
///         Ok(Script(String::from_utf8_lossy(&bytes).into_owned()))
///     }
/// }
/// ```
pub trait AsyncTryFrom<T>: Sized {
    /// The error type that can occur during conversion.
    type Error;

    /// Performs the fallible asynchronous conversion from `T` to `Self`.
    async fn async_try_from(value: T) -> Result<Self, Self::Error>;
}
