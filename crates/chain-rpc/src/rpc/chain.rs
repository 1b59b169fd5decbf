//! chain_* handlers.

use super::handler::{Handler, Params, Session};
use super::RpcContext;
use crate::domain::{BlockNumberParam, ChainMethod, ResponseError, RpcResult, SubscriptionId};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use shared_types::{BlockNumber, Hash, HeadTopic};
use tracing::debug;

#[async_trait]
impl Handler for ChainMethod {
    async fn call(
        &self,
        ctx: &RpcContext,
        params: Params<'_>,
        session: &Session,
    ) -> RpcResult<Value> {
        match self {
            ChainMethod::GetBlockHash => {
                let number = params
                    .optional::<BlockNumberParam>(0)?
                    .map(BlockNumber::from);
                to_json(ctx.resolver.get_block_hash(number).await?)
            }
            ChainMethod::GetHeader => {
                let hash = params.optional::<Hash>(0)?;
                to_json(ctx.resolver.get_header(hash).await?)
            }
            ChainMethod::GetBlock => {
                let hash = params.optional::<Hash>(0)?;
                to_json(ctx.resolver.get_block(hash).await?)
            }
            ChainMethod::GetFinalizedHead => to_json(ctx.resolver.finalized_head()),
            ChainMethod::GetHead => to_json(ctx.resolver.best_head()),
            ChainMethod::SubscribeNewHead => {
                subscribe(ctx, HeadTopic::NewHead, *self, session).await
            }
            ChainMethod::SubscribeFinalizedHeads => {
                subscribe(ctx, HeadTopic::FinalizedHead, *self, session).await
            }
            ChainMethod::Unsubscribe => {
                // Malformed ids are treated like unknown ones
                let closed = match params.optional::<SubscriptionId>(0) {
                    Ok(Some(id)) => ctx.notifier.unsubscribe(&session.connection_id, &id),
                    Ok(None) | Err(_) => false,
                };
                Ok(Value::Bool(closed))
            }
        }
    }
}

async fn subscribe(
    ctx: &RpcContext,
    topic: HeadTopic,
    method: ChainMethod,
    session: &Session,
) -> RpcResult<Value> {
    let Some(sink) = session.sink.clone() else {
        return Err(ResponseError::subscriptions_unsupported(method.name()));
    };

    let id = ctx
        .notifier
        .subscribe(topic, session.connection_id, sink)
        .await;
    debug!(subscription_id = %id, method = method.name(), "Subscription opened");
    Ok(Value::String(id))
}

fn to_json<T: Serialize>(value: T) -> RpcResult<Value> {
    serde_json::to_value(value).map_err(|e| ResponseError::internal(e.to_string()))
}
