use std::io;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::ParkingError;

/// Kind of the request
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[repr(u8)]
pub enum RequestKind {
    /// List every lot
    ListLots,

    /// Create an additional lot
    ///
    /// The payload is a JSON object with `name` and `capacity`.
    CreateLot,

    /// Retrieve occupancy of the lot whose id is the path parameter
    GetLotStatus,

    /// Rename or resize the lot whose id is the path parameter
    ///
    /// The payload is a JSON object with optional `name` and `capacity`. The
    /// capacity can't drop below the spots in use.
    UpdateLot,

    /// Remove the lot whose id is the path parameter
    ///
    /// 📌 Administrative override, not part of the admission/settlement flow.
    DeleteLot,

    /// List every ticket on record
    ListTickets,

    /// Admit a vehicle and issue its ticket
    ///
    /// The payload is a JSON object with `ticketNumber` and, optionally,
    /// `timeEntered` and `lotId`.
    Admit,

    /// Compute the amount owed on the ticket whose number is the path
    /// parameter and record it on the ticket
    ComputeFee,

    /// Compute the amount owed without recording it
    QuoteFee,

    /// Remove the ticket whose number is the path parameter
    ArchiveTicket,

    /// List every accepted payment
    ListPayments,

    /// Pay a ticket and free its spot
    ///
    /// The payload is a JSON object with `ticketNumber` and `cardNumber`.
    Settle,

    /// Retrieve the payment whose id is the path parameter
    GetPayment,
}

impl RequestKind {
    /// Whether the request only reads state
    pub fn is_read_only(&self) -> bool {
        use RequestKind::*;
        matches!(
            self,
            ListLots | GetLotStatus | ListTickets | QuoteFee | ListPayments | GetPayment
        )
    }
}

/// Request received by the facility
///
/// 📌 Hint: The engine primarily interacts with instances of this class.
pub struct Request {
    kind: RequestKind,
    id: Uuid,
    param: Option<String>,
    raw: Box<dyn RawRequest + Send>,
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("kind", &self.kind)
            .field("id", &self.id)
            .field("param", &self.param)
            .field("raw", &format_args!(".."))
            .finish()
    }
}

/// HTTP request method
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum RequestMethod {
    /// GET request
    Get,
    /// POST request, may have a payload
    Post,
    /// PUT request, may have a payload
    Put,
    /// DELETE request
    Delete,
}

/// Interface for handling requests
pub trait RequestHandler {
    /// Handle a request
    ///
    /// This method may be called concurrently from different threads.
    fn handle(&self, request: Request);

    /// Shut the facility down
    fn shutdown(self);
}

/// A raw request, implemented by the transport (HTTP server or test harness)
pub trait RawRequest {
    /// Get the URL
    fn url(&self) -> &str;
    /// Get the request method
    fn method(&self) -> RequestMethod;

    /// Read the request body as bytes
    fn read_bytes(&mut self) -> io::Result<Vec<u8>>;
    /// Read the request body as string
    fn read_string(&mut self) -> io::Result<String>;

    /// Respond with an error message
    fn respond_with_err(self: Box<Self>, status: u16, code: &'static str, msg: String, id: Uuid);
    /// Respond with a JSON document
    fn respond_with_json(self: Box<Self>, status: u16, body: String, id: Uuid);
    /// Respond without a body
    fn respond_with_empty(self: Box<Self>, status: u16, id: Uuid);
}

impl Request {
    /// Get the request's kind
    #[inline]
    pub fn kind(&self) -> &RequestKind {
        &self.kind
    }

    /// Get the request id, used to correlate log lines and responses
    #[inline]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Get the raw path parameter, if the route has one
    #[inline]
    pub fn param(&self) -> Option<&str> {
        self.param.as_deref()
    }

    /// Parse the path parameter
    pub fn parse_param<T: FromStr>(&self) -> Result<T, ParkingError> {
        let param = self
            .param
            .as_deref()
            .ok_or_else(|| ParkingError::BadRequest(String::from("missing path parameter")))?;
        param
            .parse()
            .map_err(|_| ParkingError::BadRequest(format!("invalid path parameter `{param}`")))
    }

    /// Get the request URL
    #[inline]
    #[allow(unused)]
    pub fn url(&self) -> &str {
        self.raw.url()
    }

    /// Get the request method
    #[inline]
    #[allow(unused)]
    pub fn method(&self) -> RequestMethod {
        self.raw.method()
    }

    /// Read the payload as bytes
    ///
    /// 📌 Hint: This method has side effects and should be called only once
    /// per request.
    #[inline]
    #[allow(unused)]
    pub fn read_bytes(&mut self) -> io::Result<Vec<u8>> {
        self.raw.read_bytes()
    }

    /// Read the payload as a UTF-8 string
    ///
    /// 📌 Hint: Like [`Self::read_bytes()`], this method has side effects and
    /// should be called only once per request.
    #[inline]
    #[allow(unused)]
    pub fn read_string(&mut self) -> io::Result<String> {
        self.raw.read_string()
    }

    /// Read the payload as a JSON document
    ///
    /// An unreadable or malformed payload is reported as
    /// [`ParkingError::BadRequest`].
    pub fn read_json<T: DeserializeOwned>(&mut self) -> Result<T, ParkingError> {
        let body = self
            .raw
            .read_string()
            .map_err(|err| ParkingError::BadRequest(format!("unreadable payload: {err}")))?;
        serde_json::from_str(&body)
            .map_err(|err| ParkingError::BadRequest(format!("malformed payload: {err}")))
    }

    /// Respond with the status and message of `err`
    ///
    /// This method blocks until the response has been sent.
    #[inline]
    pub fn respond_with_err(self, err: &ParkingError) {
        self.raw
            .respond_with_err(err.status(), err.code(), err.to_string(), self.id);
    }

    /// Respond with `value` rendered as JSON
    ///
    /// This method blocks until the response has been sent.
    pub fn respond_with_json<T: Serialize + ?Sized>(self, status: u16, value: &T) {
        match serde_json::to_string(value) {
            Ok(body) => self.raw.respond_with_json(status, body, self.id),
            Err(err) => self.raw.respond_with_err(
                500,
                "serialization",
                format!("response could not be rendered: {err}"),
                self.id,
            ),
        }
    }

    /// Respond with `204 No Content`
    ///
    /// This method blocks until the response has been sent.
    #[inline]
    pub fn respond_with_no_content(self) {
        self.raw.respond_with_empty(204, self.id);
    }

    /// Create a new request from a [`RawRequest`]
    ///
    /// 📌 Hint: Normally only the transports need this function.
    #[inline]
    pub fn from_raw(
        kind: RequestKind,
        id: Uuid,
        param: Option<String>,
        raw: Box<dyn RawRequest + Send>,
    ) -> Self {
        Self {
            kind,
            id,
            param,
            raw,
        }
    }
}
