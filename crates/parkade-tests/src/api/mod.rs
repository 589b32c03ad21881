use std::sync::Arc;

use chrono::{DateTime, Utc};
use eyre::Result;
use flume::Sender;
use parkade_core::{
    CardNumber, Checkout, Entry, Lot, LotId, LotUpdate, NewLot, Payment, RequestKind, Ticket,
    TicketNumber,
};
use parkade_engine::FeeQuote;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::oneshot;
use uuid::Uuid;

pub mod mock;

#[derive(Debug, Error)]
#[error("Error {status} ({code}): {message}")]
pub struct ApiError {
    pub status: u16,
    pub code: String,
    pub message: String,
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug)]
enum Response {
    Error {
        status: u16,
        code: &'static str,
        msg: String,
        id: Uuid,
    },
    Json {
        status: u16,
        body: String,
        id: Uuid,
    },
    Empty {
        status: u16,
        id: Uuid,
    },
}

impl Response {
    fn into_api_response<T: DeserializeOwned>(self) -> Result<ApiResponse<T>> {
        Ok(match self {
            Response::Error {
                status,
                code,
                msg,
                id,
            } => ApiResponse {
                id,
                status,
                result: Err(ApiError {
                    status,
                    code: code.into(),
                    message: msg,
                }),
            },
            Response::Json { status, body, id } => ApiResponse {
                id,
                status,
                result: Ok(serde_json::from_str(&body)?),
            },
            Response::Empty { status, id } => ApiResponse {
                id,
                status,
                result: Ok(serde_json::from_str("null")?),
            },
        })
    }
}

struct RequestMsg {
    kind: RequestKind,
    id: Uuid,
    param: Option<String>,
    body: Vec<u8>,
    response_channel: oneshot::Sender<Response>,
}

pub struct Api {
    /// One channel per handler thread
    channels: Arc<Vec<Sender<RequestMsg>>>,

    my_channel: Sender<RequestMsg>,
    my_index: usize,
}

impl Api {
    fn new(channels: Vec<Sender<RequestMsg>>) -> Self {
        let my_channel = channels[0].clone();
        Self {
            channels: Arc::new(channels),
            my_channel,
            my_index: 0,
        }
    }
}

impl Clone for Api {
    fn clone(&self) -> Self {
        let my_index = (self.my_index + 1) % self.channels.len();
        Self {
            channels: self.channels.clone(),
            my_channel: self.channels[my_index].clone(),
            my_index,
        }
    }
}

impl Api {
    /// Send a request with a raw payload, as a client on the wire would
    pub async fn send_raw<T: DeserializeOwned>(
        &self,
        kind: RequestKind,
        param: Option<String>,
        body: impl Into<Vec<u8>>,
    ) -> Result<ApiResponse<T>> {
        let (sender, receiver) = oneshot::channel();
        let msg = RequestMsg {
            kind,
            id: Uuid::new_v4(),
            param,
            body: body.into(),
            response_channel: sender,
        };
        self.my_channel.send_async(msg).await?;
        receiver.await?.into_api_response()
    }

    async fn make_request<T: DeserializeOwned, P: Serialize>(
        &self,
        kind: RequestKind,
        param: Option<String>,
        payload: Option<&P>,
    ) -> Result<ApiResponse<T>> {
        let body = match payload {
            Some(payload) => serde_json::to_vec(payload)?,
            None => Vec::new(),
        };
        self.send_raw(kind, param, body).await
    }

    /// Send a request without a payload
    async fn send_empty<T: DeserializeOwned>(
        &self,
        kind: RequestKind,
        param: Option<String>,
    ) -> Result<ApiResponse<T>> {
        self.make_request(kind, param, None::<&()>).await
    }

    pub async fn list_lots(&self) -> Result<ApiResponse<Vec<Lot>>> {
        self.send_empty(RequestKind::ListLots, None).await
    }

    pub async fn create_lot(&self, name: &str, capacity: u32) -> Result<ApiResponse<Lot>> {
        let new = NewLot {
            name: name.into(),
            capacity,
        };
        self.make_request(RequestKind::CreateLot, None, Some(&new))
            .await
    }

    pub async fn lot_status(&self, lot_id: LotId) -> Result<ApiResponse<Lot>> {
        self.send_empty(RequestKind::GetLotStatus, Some(lot_id.to_string()))
            .await
    }

    pub async fn update_lot(
        &self,
        lot_id: LotId,
        update: &LotUpdate,
    ) -> Result<ApiResponse<Lot>> {
        self.make_request(RequestKind::UpdateLot, Some(lot_id.to_string()), Some(update))
            .await
    }

    pub async fn delete_lot(&self, lot_id: LotId) -> Result<ApiResponse<()>> {
        self.send_empty(RequestKind::DeleteLot, Some(lot_id.to_string()))
            .await
    }

    pub async fn list_tickets(&self) -> Result<ApiResponse<Vec<Ticket>>> {
        self.send_empty(RequestKind::ListTickets, None).await
    }

    /// Admit a vehicle into the default lot at the facility's current time
    pub async fn admit(&self, ticket_number: TicketNumber) -> Result<ApiResponse<Ticket>> {
        self.admit_entry(&Entry {
            ticket_number,
            time_entered: None,
            lot_id: None,
        })
        .await
    }

    /// Admit a vehicle into `lot_id`
    pub async fn admit_into(
        &self,
        ticket_number: TicketNumber,
        lot_id: LotId,
    ) -> Result<ApiResponse<Ticket>> {
        self.admit_entry(&Entry {
            ticket_number,
            time_entered: None,
            lot_id: Some(lot_id),
        })
        .await
    }

    /// Admit a vehicle into the default lot, entered at `time_entered`
    pub async fn admit_at(
        &self,
        ticket_number: TicketNumber,
        time_entered: DateTime<Utc>,
    ) -> Result<ApiResponse<Ticket>> {
        self.admit_entry(&Entry {
            ticket_number,
            time_entered: Some(time_entered),
            lot_id: None,
        })
        .await
    }

    pub async fn admit_entry(&self, entry: &Entry) -> Result<ApiResponse<Ticket>> {
        self.make_request(RequestKind::Admit, None, Some(entry))
            .await
    }

    pub async fn compute_fee(&self, ticket_number: TicketNumber) -> Result<ApiResponse<Ticket>> {
        self.send_empty(RequestKind::ComputeFee, Some(ticket_number.to_string()))
            .await
    }

    pub async fn quote(&self, ticket_number: TicketNumber) -> Result<ApiResponse<FeeQuote>> {
        self.send_empty(RequestKind::QuoteFee, Some(ticket_number.to_string()))
            .await
    }

    pub async fn archive(&self, ticket_number: TicketNumber) -> Result<ApiResponse<()>> {
        self.send_empty(RequestKind::ArchiveTicket, Some(ticket_number.to_string()))
            .await
    }

    pub async fn list_payments(&self) -> Result<ApiResponse<Vec<Payment>>> {
        self.send_empty(RequestKind::ListPayments, None).await
    }

    pub async fn settle(
        &self,
        ticket_number: TicketNumber,
        card_number: u128,
    ) -> Result<ApiResponse<Payment>> {
        let checkout = Checkout {
            ticket_number,
            card_number: CardNumber(card_number),
        };
        self.make_request(RequestKind::Settle, None, Some(&checkout))
            .await
    }

    pub async fn payment(&self, id: Uuid) -> Result<ApiResponse<Payment>> {
        self.send_empty(RequestKind::GetPayment, Some(id.to_string()))
            .await
    }
}

pub struct ApiResponse<T> {
    /// Request id echoed by the facility
    pub id: Uuid,
    pub status: u16,
    pub result: ApiResult<T>,
}

impl<T> ApiResponse<T> {
    /// The error code if the request was refused
    pub fn code(&self) -> Option<&str> {
        self.result.as_ref().err().map(|err| err.code.as_str())
    }
}
