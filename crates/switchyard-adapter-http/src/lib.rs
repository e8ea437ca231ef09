//! Single-endpoint HTTP transport adapter: every `POST /` body becomes one
//! message, dispatched synchronously within the request. The response body
//! is `{"result":"ack"}` or `{"result":"nack"}` depending on what the
//! handler did; a dispatch fault that propagates (no DLQ configured)
//! becomes a 500 with no body.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

use switchyard_core::adapter::Adapter;
use switchyard_core::message::{FromRawData, Message};
use switchyard_core::processor::Processor;
use switchyard_core::shutdown::ShutdownCoordinator;
use switchyard_core::SwitchyardError;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Pending,
    Acked,
    Nacked,
}

/// An [`Adapter`] scoped to a single in-flight request: `ack`/`nack`
/// record the outcome for that request to read back once dispatch
/// returns, rather than accumulating across requests.
struct RequestAdapter {
    outcome: Mutex<Outcome>,
}

impl RequestAdapter {
    fn new() -> Self {
        Self {
            outcome: Mutex::new(Outcome::Pending),
        }
    }

    fn outcome(&self) -> Outcome {
        *self.outcome.lock().expect("poisoned")
    }
}

impl<M: Message> Adapter<M> for RequestAdapter {
    fn ack(&self, _message: &M) -> Result<(), SwitchyardError> {
        *self.outcome.lock().expect("poisoned") = Outcome::Acked;
        Ok(())
    }

    fn nack(&self, _message: &M) -> Result<(), SwitchyardError> {
        *self.outcome.lock().expect("poisoned") = Outcome::Nacked;
        Ok(())
    }
}

async fn handle<M, PS, HS>(
    req: Request<Incoming>,
    processor: Arc<Processor<M, PS, HS>>,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    M: FromRawData,
    PS: Default,
    HS: Default,
{
    let body = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(_) => {
            return Ok(Response::builder()
                .status(StatusCode::BAD_REQUEST)
                .body(Full::new(Bytes::new()))
                .unwrap())
        }
    };

    let message = M::from_raw_data(body.to_vec());
    let request_adapter = Arc::new(RequestAdapter::new());
    let dyn_adapter: Arc<dyn Adapter<M>> = Arc::clone(&request_adapter) as Arc<dyn Adapter<M>>;

    match processor.process(dyn_adapter, message) {
        Ok(()) => {
            let (status, body): (StatusCode, &'static [u8]) = match request_adapter.outcome() {
                Outcome::Nacked => (StatusCode::INTERNAL_SERVER_ERROR, br#"{"result":"nack"}"#),
                _ => (StatusCode::OK, br#"{"result":"ack"}"#),
            };
            Ok(Response::builder()
                .status(status)
                .body(Full::new(Bytes::from_static(body)))
                .unwrap())
        }
        Err(e) => {
            tracing::error!(reason = %e, "http dispatch failed");
            Ok(Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .body(Full::new(Bytes::new()))
                .unwrap())
        }
    }
}

/// Serves `POST /` at `addr` until `shutdown` is signalled.
pub async fn serve<M, PS, HS>(
    addr: SocketAddr,
    processor: Arc<Processor<M, PS, HS>>,
    shutdown: ShutdownCoordinator,
) -> std::io::Result<()>
where
    M: FromRawData,
    PS: Default + Send + Sync + 'static,
    HS: Default + Send + Sync + 'static,
{
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "http adapter listening");

    loop {
        if shutdown.should_exit() {
            return Ok(());
        }
        let accepted = tokio::select! {
            accepted = listener.accept() => accepted,
            _ = tokio::time::sleep(std::time::Duration::from_millis(200)) => continue,
        };
        let (stream, _peer) = accepted?;
        let io = TokioIo::new(stream);
        let processor = Arc::clone(&processor);

        tokio::task::spawn(async move {
            let service = service_fn(move |req| handle(req, Arc::clone(&processor)));
            if let Err(e) = hyper::server::conn::http1::Builder::new()
                .serve_connection(io, service)
                .await
            {
                tracing::warn!(reason = %e, "http connection error");
            }
        });
    }
}
