//! Live purchase feed for the admin dashboard.
//!
//! Server-Sent Events stream of purchases for one UTC calendar day,
//! delivered in publish order as they are recorded.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::{
        IntoResponse,
        sse::{Event as SseEvent, KeepAlive, Sse},
    },
};
use chrono::Utc;
use tokio::sync::mpsc::unbounded_channel;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::app::routes::admin::require_operator;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::AccountContext;

/// GET /admin/purchases/stream?date=YYYY-MM-DD
///
/// Each delivered event is named `purchase` and carries the purchase record
/// as JSON. Heartbeat events keep idle connections alive.
pub async fn stream_purchases(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AccountContext>,
    Query(query): Query<dto::PurchaseStreamQuery>,
) -> axum::response::Response {
    if let Err(resp) = require_operator(&ctx) {
        return resp;
    }

    let day = query.date.unwrap_or_else(|| Utc::now().date_naive());
    let subscription = match services.revenue.subscribe_for_day(day) {
        Ok(sub) => sub,
        Err(e) => {
            return errors::json_error(
                StatusCode::SERVICE_UNAVAILABLE,
                "feed_unavailable",
                e.to_string(),
            );
        }
    };

    let (tx, rx) = unbounded_channel::<Result<SseEvent, Infallible>>();

    // Forward the blocking subscription into the SSE channel. The loop ends
    // when the client disconnects (send fails).
    tokio::task::spawn_blocking(move || {
        let mut last_heartbeat = std::time::Instant::now();

        loop {
            match subscription.recv_timeout(Duration::from_millis(1000)) {
                Some(record) => {
                    let payload = dto::purchase_record_to_json(&record).to_string();
                    let event = SseEvent::default().event("purchase").data(payload);
                    if tx.send(Ok(event)).is_err() {
                        break;
                    }
                    last_heartbeat = std::time::Instant::now();
                }
                None => {
                    if last_heartbeat.elapsed() > Duration::from_secs(15) {
                        let heartbeat = SseEvent::default().event("heartbeat").data("{}");
                        if tx.send(Ok(heartbeat)).is_err() {
                            break;
                        }
                        last_heartbeat = std::time::Instant::now();
                    }
                }
            }
        }
    });

    let stream = UnboundedReceiverStream::new(rx);
    Sse::new(stream)
        .keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
        .into_response()
}
