use std::fmt::Debug;

use futures::future::join_all;
use slotbook_infra::SlotbookContext;
use tracing::debug;

/// Subscriber is a side effect to a `UseCase`
///
/// It is going to act upon the response of the execution
/// of the `UseCase` if the execution was a success.
#[async_trait::async_trait]
pub trait Subscriber<U: UseCase>: Send + Sync {
    async fn notify(&self, e: &U::Response, ctx: &SlotbookContext);
}

#[async_trait::async_trait]
pub trait UseCase: Debug + Send {
    type Response: Debug + Send;
    type Error: Send;

    /// UseCase name identifier
    const NAME: &'static str;

    async fn execute(&mut self, ctx: &SlotbookContext) -> Result<Self::Response, Self::Error>;

    fn subscribers() -> Vec<Box<dyn Subscriber<Self>>> {
        Default::default()
    }
}

#[tracing::instrument(name = "UseCase executed", skip(usecase, ctx), fields(usecase = %U::NAME))]
pub async fn execute<U>(usecase: U, ctx: &SlotbookContext) -> Result<U::Response, U::Error>
where
    U: UseCase + Send,
    U::Error: Debug + Send,
{
    _execute(usecase, ctx).await
}

async fn _execute<U>(mut usecase: U, ctx: &SlotbookContext) -> Result<U::Response, U::Error>
where
    U: UseCase + Send,
    U::Error: Debug + Send,
{
    debug!("{:?}", usecase);
    let res = usecase.execute(ctx).await;

    match &res {
        Ok(res) => {
            let subscribers = U::subscribers();
            let mut subscriber_promises = Vec::with_capacity(subscribers.len());
            for subscriber in &subscribers {
                subscriber_promises.push(subscriber.notify(res, ctx));
            }
            join_all(subscriber_promises).await;
        }
        Err(e) => {
            // This is debug because the error is usually already logged deeper in the stack
            debug!("Error: {:?}", e);
        }
    }

    res
}
