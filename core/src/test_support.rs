//! Recording stub transport shared by the unit tests.

use std::sync::Mutex;

use crate::http::{HttpRequest, HttpResponse, Transport, TransportError};

type Responder = dyn Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync;

/// Captures every outgoing request and answers with a canned response.
pub(crate) struct RecordingTransport {
    requests: Mutex<Vec<HttpRequest>>,
    responder: Box<Responder>,
}

impl RecordingTransport {
    pub(crate) fn with(
        responder: impl Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            responder: Box::new(responder),
        }
    }

    pub(crate) fn respond(status: u16, body: &str) -> Self {
        let body = body.as_bytes().to_vec();
        Self::with(move |_| {
            Ok(HttpResponse {
                status,
                headers: vec![("Content-Type".to_string(), "application/json".to_string())],
                body: body.clone(),
            })
        })
    }

    pub(crate) fn ok() -> Self {
        Self::respond(200, r#"{"code":200,"data":{}}"#)
    }

    pub(crate) fn failing(message: &str) -> Self {
        let message = message.to_string();
        Self::with(move |_| Err(TransportError::new(message.clone())))
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn last_request(&self) -> HttpRequest {
        self.requests().pop().expect("no request was sent")
    }
}

impl Transport for RecordingTransport {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let response = (self.responder)(&request);
        self.requests.lock().unwrap().push(request);
        response
    }
}
