//! [`Handler`] abstraction.

use std::future::Future;

/// Asynchronous unit of work taking `Args` and resolving into a [`Result`].
///
/// Commands, queries, database operations and remote API calls are all
/// [`Handler`]s, each implemented for a distinct `Args` type, so callers
/// depend on the operation rather than the concrete backend.
///
/// Returned [`Future`]s are [`Send`], so they can be awaited inside
/// multi-threaded HTTP handlers.
pub trait Handler<Args = ()> {
    /// Successful outcome.
    type Ok;

    /// Failure outcome.
    type Err;

    /// Runs this [`Handler`] on the provided `args`.
    fn execute(
        &self,
        args: Args,
    ) -> impl Future<Output = Result<Self::Ok, Self::Err>> + Send;
}

#[cfg(test)]
mod spec {
    use super::Handler;

    struct Doubler;

    impl Handler<u32> for Doubler {
        type Ok = u32;
        type Err = &'static str;

        async fn execute(&self, n: u32) -> Result<u32, &'static str> {
            n.checked_mul(2).ok_or("overflow")
        }
    }

    impl Handler<String> for Doubler {
        type Ok = String;
        type Err = ();

        async fn execute(&self, s: String) -> Result<String, ()> {
            Ok(s.repeat(2))
        }
    }

    #[tokio::test]
    async fn dispatches_by_argument_type() {
        assert_eq!(Doubler.execute(21).await, Ok(42));
        assert_eq!(Doubler.execute(u32::MAX).await, Err("overflow"));
        assert_eq!(Doubler.execute("ab".to_owned()).await, Ok("abab".to_owned()));
    }
}
