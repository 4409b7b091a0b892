//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module
//! neat and tidy 🙏
//!
//! Any long, non-cpu-bound operation (gateway lookups, store I/O) must be awaited, never
//! blocked on: each worker thread processes its requests sequentially, and a blocking handler
//! stalls every other request on that worker.
use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use log::*;
use reconciliation_engine::{
    db_types::Order,
    OrderManagement,
    ReconcileApi,
    ReconcileResult,
    ReconciliationDatabase,
    ReconciliationError,
};

use crate::{
    data_objects::{JsonResponse, VerificationResult},
    errors::ServerError,
    integrations::gateway::{GatewayAdapter, WebhookError, SIGNATURE_HEADER},
};
use gateway_tools::WebhookEvent;

// Actix cannot handle generics in handlers, so the registration is implemented manually using
// the `route!` macro.
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Webhook  ----------------------------------------------------
route!(gateway_webhook => Post "/webhook" impl ReconciliationDatabase, GatewayAdapter);
/// The asynchronous ingestion path. The gateway pushes transaction events here with
/// at-least-once delivery, so everything past the authenticity gate must acknowledge with a 200
/// (replays, unknown references and flagged conflicts included) or the gateway will redeliver
/// forever. Only an unauthenticated payload earns a 400.
pub async fn gateway_webhook<BRec, AGw>(
    req: HttpRequest,
    body: web::Json<WebhookEvent>,
    api: web::Data<ReconcileApi<BRec>>,
    adapter: web::Data<AGw>,
) -> HttpResponse
where
    BRec: ReconciliationDatabase,
    AGw: GatewayAdapter,
{
    trace!("🏦️ Received webhook request: {}", req.uri());
    let event = body.into_inner();
    let signature = req.headers().get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
    let outcome = match adapter.parse_webhook(signature, &event) {
        Err(WebhookError::Authenticity(e)) => {
            warn!("🏦️ Rejecting webhook for transaction {}. {e}", event.transaction.id);
            return HttpResponse::BadRequest().json(JsonResponse::failure(e));
        },
        Err(WebhookError::Conversion(e)) => {
            error!("🏦️ Webhook for transaction {} is authentic but unusable. {e}", event.transaction.id);
            return HttpResponse::Ok().json(JsonResponse::failure(e));
        },
        Ok(outcome) => outcome,
    };
    let result = match api.reconcile(&outcome.order_reference, &outcome).await {
        Ok(ReconcileResult::NoChange) => JsonResponse::success("Transaction still pending. Nothing to apply."),
        Ok(ReconcileResult::Transitioned { order, .. }) => {
            info!("🏦️ Order {} settled as {}", order.reference, order.payment_status);
            JsonResponse::success("Outcome applied.")
        },
        Ok(ReconcileResult::AlreadyApplied { order, .. }) => {
            debug!("🏦️ Duplicate delivery for order {}. Already applied.", order.reference);
            JsonResponse::success("Already applied.")
        },
        Ok(ReconcileResult::ConflictFlagged { order, incoming }) => {
            warn!(
                "🏦️ Order {} is {} but the gateway now says {}. Recorded for manual review.",
                order.reference, order.payment_status, incoming
            );
            JsonResponse::failure("Conflicting signal recorded for review.")
        },
        Err(ReconciliationError::OrderNotFound(reference)) => {
            // Legitimate when the webhook outruns the order-creation write. Acknowledge so the
            // gateway's next redelivery can land after the order exists.
            warn!("🏦️ No order yet for {reference}. Acknowledged without effect.");
            JsonResponse::failure("Order not found.")
        },
        Err(ReconciliationError::TransitionContention(reference)) => {
            warn!("🏦️ Order {reference} is contended. The next delivery will settle it.");
            JsonResponse::failure("Order contended. Retry will settle it.")
        },
        Err(e) => {
            warn!("🏦️ Unexpected error while handling webhook. {e}");
            JsonResponse::failure("Unexpected error handling webhook.")
        },
    };
    HttpResponse::Ok().json(result)
}

//----------------------------------------------   Verification  ----------------------------------------------------
route!(verify_payment => Get "/verify/{transaction_id}" impl ReconciliationDatabase, GatewayAdapter);
/// The synchronous ingestion path. Clients poll here with a gateway transaction id; the current
/// status is fetched from the gateway, reconciled, and the resulting order view returned.
///
/// A gateway that cannot be consulted degrades to the last stored state for that transaction
/// (the best-known answer). Only when there is none does the caller get a 503 "unknown, try
/// again". An adapter failure is never presented as a terminal status.
pub async fn verify_payment<BRec, AGw>(
    path: web::Path<String>,
    api: web::Data<ReconcileApi<BRec>>,
    adapter: web::Data<AGw>,
) -> Result<HttpResponse, ServerError>
where
    BRec: ReconciliationDatabase,
    AGw: GatewayAdapter,
{
    let transaction_id = path.into_inner();
    trace!("💻️ Verification request for transaction {transaction_id}");
    let outcome = match adapter.fetch_transaction(&transaction_id).await {
        Ok(outcome) => outcome,
        Err(e) => {
            debug!("💻️ Could not fetch transaction {transaction_id} from the gateway. {e}");
            return match fetch_order_by_transaction_id(api.as_ref(), &transaction_id).await? {
                Some(order) => {
                    debug!("💻️ Serving last known state of order {} instead", order.reference);
                    Ok(HttpResponse::Ok().json(VerificationResult::from(&order)))
                },
                None => Err(ServerError::StatusUnknown("Try again shortly.".to_string())),
            };
        },
    };
    let order = match api.reconcile(&outcome.order_reference, &outcome).await {
        Ok(result) => match result {
            ReconcileResult::Transitioned { order, .. }
            | ReconcileResult::AlreadyApplied { order, .. }
            | ReconcileResult::ConflictFlagged { order, .. } => Some(order),
            // a still-pending outcome applies nothing; serve the stored state
            ReconcileResult::NoChange => None,
        },
        Err(ReconciliationError::OrderNotFound(reference)) => {
            return Err(ServerError::NoRecordFound(format!("No order correlates with {reference}")));
        },
        // the status is moving under concurrent signals; the stored state is still best-known
        Err(ReconciliationError::TransitionContention(_)) => None,
        Err(e) => return Err(ServerError::BackendError(e.to_string())),
    };
    let order = match order {
        Some(order) => order,
        None => api
            .db()
            .fetch_order_by_reference(&outcome.order_reference)
            .await
            .map_err(|e| ServerError::BackendError(e.to_string()))?
            .ok_or_else(|| ServerError::NoRecordFound(format!("No order correlates with {}", outcome.order_reference)))?,
    };
    Ok(HttpResponse::Ok().json(VerificationResult::from(&order)))
}

async fn fetch_order_by_transaction_id<B: ReconciliationDatabase>(
    api: &ReconcileApi<B>,
    transaction_id: &str,
) -> Result<Option<Order>, ServerError> {
    api.db().fetch_order_by_transaction_id(transaction_id).await.map_err(|e| ServerError::BackendError(e.to_string()))
}
