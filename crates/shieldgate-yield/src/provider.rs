// Yield API action source
//
// Implements the core ActionSource trait: confirm the yield exists, request
// the action for the intent, then normalise the transactions it returns.

use async_trait::async_trait;
use shieldgate_core::{
    ActionPlan, ActionRequest, ActionSource, CandidateTransaction, Intent, UpstreamError,
};

use crate::client::YieldClient;
use crate::types::{YieldActionBody, YieldActionResponse};

pub struct YieldActionSource {
    client: YieldClient,
}

impl YieldActionSource {
    pub fn new(client: YieldClient) -> Self {
        Self { client }
    }

    /// Fill in the defaults the upstream is allowed to omit
    fn normalise(request: &ActionRequest, response: YieldActionResponse) -> ActionPlan {
        let transactions = response
            .transactions
            .into_iter()
            .enumerate()
            .map(|(i, tx)| CandidateTransaction {
                id: tx.id,
                step_index: tx.step_index.unwrap_or(i as i32),
                network: tx.network,
                title: tx.title.unwrap_or_else(|| format!("step-{}", i)),
                unsigned_transaction: tx.unsigned_transaction,
                structured_transaction: tx.structured_transaction,
                annotated_transaction: tx.annotated_transaction,
                is_message: tx.is_message.unwrap_or(false),
            })
            .collect();

        ActionPlan {
            yield_id: response
                .yield_id
                .unwrap_or_else(|| request.yield_id.clone()),
            transactions,
        }
    }
}

#[async_trait]
impl ActionSource for YieldActionSource {
    async fn create_action(&self, request: &ActionRequest) -> Result<ActionPlan, UpstreamError> {
        self.client.get_yield(&request.yield_id).await?;

        let manage = request.intent == Intent::Manage;
        let body = YieldActionBody {
            yield_id: &request.yield_id,
            address: &request.address,
            arguments: &request.arguments,
            action: request.action.as_deref().filter(|_| manage),
            passthrough: request.passthrough.as_ref().filter(|_| manage),
        };

        let response = self.client.create_action(request.intent, &body).await?;
        let plan = Self::normalise(request, response);

        tracing::info!(
            intent = %request.intent,
            yield_id = %request.yield_id,
            transactions = plan.transactions.len(),
            "Yield action created"
        );

        Ok(plan)
    }

    fn name(&self) -> &'static str {
        "yield"
    }
}
