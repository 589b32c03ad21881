//! 🏗 HTTP request implementation

use std::io;
use std::io::Read;

use parkade_core::{RequestKind, RequestMethod};
use serde_json::json;
use tiny_http::{Header, Response};
use tracing::warn;
use uuid::Uuid;

const ROUTES: &str = "🦀 could not find the service you are looking for!

Valid requests are:
  GET    /api/lots
  POST   /api/lots
  GET    /api/lots/{id}
  PUT    /api/lots/{id}
  DELETE /api/lots/{id}
  GET    /api/tickets
  POST   /api/tickets
  GET    /api/tickets/{number}
  GET    /api/tickets/{number}/quote
  DELETE /api/tickets/{number}
  GET    /api/payments
  POST   /api/payments
  GET    /api/payments/{id}";

struct HTTPRequest(tiny_http::Request);

impl parkade_core::RawRequest for HTTPRequest {
    fn url(&self) -> &str {
        self.0.url()
    }

    fn method(&self) -> RequestMethod {
        match self.0.method() {
            tiny_http::Method::Post => RequestMethod::Post,
            tiny_http::Method::Put => RequestMethod::Put,
            tiny_http::Method::Delete => RequestMethod::Delete,
            _ => RequestMethod::Get,
        }
    }

    fn read_bytes(&mut self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.0.body_length().unwrap_or(0));
        self.0.as_reader().read_to_end(&mut buf)?;
        Ok(buf)
    }

    fn read_string(&mut self) -> io::Result<String> {
        let mut s = String::with_capacity(self.0.body_length().unwrap_or(0));
        self.0.as_reader().read_to_string(&mut s)?;
        Ok(s)
    }

    fn respond_with_err(self: Box<Self>, status: u16, code: &'static str, msg: String, id: Uuid) {
        let body = json!({ "code": code, "message": msg }).to_string();
        self.respond(Response::from_string(body).with_status_code(status), id, true)
    }

    fn respond_with_json(self: Box<Self>, status: u16, body: String, id: Uuid) {
        self.respond(Response::from_string(body).with_status_code(status), id, true)
    }

    fn respond_with_empty(self: Box<Self>, status: u16, id: Uuid) {
        self.respond(Response::empty(status), id, false)
    }
}

impl HTTPRequest {
    /// Add HTTP headers (CORS, X-Request-Id, Content-Type) to `res` and send it
    fn respond<R: Read>(self, mut res: Response<R>, id: Uuid, json: bool) {
        add_response_cors_headers(&mut res);
        add_header(&mut res, "X-Request-Id", &id.hyphenated().to_string());
        if json {
            add_header(&mut res, "Content-Type", "application/json");
        }
        send(self.0, res);
    }
}

/// Map a method and URL onto a request kind and its path parameter
pub fn route(method: &tiny_http::Method, url: &str) -> Option<(RequestKind, Option<String>)> {
    use tiny_http::Method::*;
    use RequestKind::*;

    let path = url.split_once('?').map_or(url, |(path, _)| path);
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
    let param = |s: &str| Some(s.to_owned());

    let routed = match (method, segments.as_slice()) {
        (Get, ["api", "lots"]) => (ListLots, None),
        (Post, ["api", "lots"]) => (CreateLot, None),
        (Get, ["api", "lots", id]) => (GetLotStatus, param(id)),
        (Put, ["api", "lots", id]) => (UpdateLot, param(id)),
        (Delete, ["api", "lots", id]) => (DeleteLot, param(id)),
        (Get, ["api", "tickets"]) => (ListTickets, None),
        (Post, ["api", "tickets"]) => (Admit, None),
        (Get, ["api", "tickets", number]) => (ComputeFee, param(number)),
        (Get, ["api", "tickets", number, "quote"]) => (QuoteFee, param(number)),
        (Delete, ["api", "tickets", number]) => (ArchiveTicket, param(number)),
        (Get, ["api", "payments"]) => (ListPayments, None),
        (Post, ["api", "payments"]) => (Settle, None),
        (Get, ["api", "payments", id]) => (GetPayment, param(id)),
        _ => return None,
    };
    Some(routed)
}

/// Parse the given HTTP request
///
/// If [`None`] is returned, the request was already answered with a
/// corresponding error message.
pub fn parse(rq: tiny_http::Request) -> Option<parkade_core::Request> {
    use tiny_http::Method::*;

    let (kind, param) = match (rq.method(), route(rq.method(), rq.url())) {
        (Options, _) => {
            let mut res = Response::empty(204);
            add_response_cors_headers(&mut res);
            send(rq, res);
            return None;
        }
        (_, Some(routed)) => routed,
        (Get, None) | (Post, None) | (Put, None) | (Delete, None) => {
            let mut res = Response::from_string(ROUTES).with_status_code(404);
            add_response_cors_headers(&mut res);
            send(rq, res);
            return None;
        }
        _ => {
            let mut res = Response::empty(405);
            add_response_cors_headers(&mut res);
            send(rq, res);
            return None;
        }
    };

    let id = rq
        .headers()
        .iter()
        .find(|hdr| hdr.field.equiv("x-request-id"))
        .and_then(|hdr| Uuid::parse_str(hdr.value.as_str()).ok())
        .unwrap_or_else(Uuid::new_v4);

    Some(parkade_core::Request::from_raw(
        kind,
        id,
        param,
        Box::new(HTTPRequest(rq)),
    ))
}

fn send<R: Read>(rq: tiny_http::Request, res: Response<R>) {
    if let Err(err) = rq.respond(res) {
        warn!(%err, "HTTP response failed");
    }
}

fn add_header<R: Read>(res: &mut Response<R>, field: &str, value: &str) {
    if let Ok(header) = Header::from_bytes(field.as_bytes(), value.as_bytes()) {
        res.add_header(header);
    }
}

/// Add CORS headers to `res`
fn add_response_cors_headers<R: Read>(res: &mut Response<R>) {
    add_header(res, "Access-Control-Request-Method", "*");
    add_header(res, "Access-Control-Allow-Origin", "*");
    add_header(res, "Access-Control-Allow-Headers", "*");
    add_header(res, "Access-Control-Expose-Headers", "*");
}

#[cfg(test)]
mod tests {
    use tiny_http::Method;

    use super::*;

    #[test]
    fn routes_with_parameters() {
        assert_eq!(
            route(&Method::Get, "/api/tickets/17"),
            Some((RequestKind::ComputeFee, Some(String::from("17"))))
        );
        assert_eq!(
            route(&Method::Get, "/api/tickets/17/quote"),
            Some((RequestKind::QuoteFee, Some(String::from("17"))))
        );
        assert_eq!(
            route(&Method::Delete, "/api/lots/2/"),
            Some((RequestKind::DeleteLot, Some(String::from("2"))))
        );
        assert_eq!(
            route(&Method::Put, "/api/lots/2"),
            Some((RequestKind::UpdateLot, Some(String::from("2"))))
        );
    }

    #[test]
    fn routes_ignore_query_strings() {
        assert_eq!(
            route(&Method::Post, "/api/payments?dry=1"),
            Some((RequestKind::Settle, None))
        );
    }

    #[test]
    fn unknown_routes() {
        assert_eq!(route(&Method::Get, "/api/debug"), None);
        assert_eq!(route(&Method::Put, "/api/lots"), None);
        assert_eq!(route(&Method::Patch, "/api/lots/1"), None);
        assert_eq!(route(&Method::Get, "/api/tickets/1/2/3"), None);
    }
}
