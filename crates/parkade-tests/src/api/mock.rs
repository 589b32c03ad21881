//! Mock API implementation directly using the `parkade-engine` crate

use std::sync::Arc;

use eyre::Result;
use parkade_core::{Config, RawRequest, Request, RequestHandler, RequestKind, RequestMethod};
use parkade_engine::{Facility, ManualClock, MemoryStore};
use tokio::sync::oneshot;
use tokio::task::{self, JoinHandle};
use uuid::Uuid;

use super::{Api, RequestMsg, Response};

pub struct MockFacility {
    facility: Arc<Facility>,
    join_handles: Vec<JoinHandle<()>>,
}

struct MockRawRequest {
    kind: RequestKind,
    url: String,
    body: Option<Vec<u8>>,
    response_channel: oneshot::Sender<Response>,
}

pub async fn start(
    threads: u16,
    config: Config,
    clock: Arc<ManualClock>,
) -> Result<(MockFacility, Api)> {
    let facility = Arc::new(
        task::spawn_blocking(move || {
            parkade_engine::launch_with(&config, Arc::new(MemoryStore::new()), clock)
        })
        .await??,
    );

    let it = (0..threads).map(|_| {
        let (sender, receiver) = flume::bounded::<RequestMsg>(65536);
        let facility = facility.clone();
        let handle = task::spawn_blocking(move || {
            let facility = &*facility;
            for msg in receiver.into_iter() {
                let raw = Box::new(MockRawRequest {
                    kind: msg.kind,
                    url: url(msg.kind, msg.param.as_deref()),
                    body: Some(msg.body),
                    response_channel: msg.response_channel,
                });
                facility.handle(Request::from_raw(msg.kind, msg.id, msg.param, raw))
            }
        });
        (sender, handle)
    });
    let (senders, join_handles) = it.unzip();

    let mock_facility = MockFacility {
        facility,
        join_handles,
    };
    Ok((mock_facility, Api::new(senders)))
}

impl MockFacility {
    pub async fn shutdown(self) {
        for handle in self.join_handles {
            handle.await.unwrap()
        }
        task::spawn_blocking(move || Arc::into_inner(self.facility).unwrap().shutdown())
            .await
            .unwrap();
    }
}

/// The URL the HTTP server routes to `kind`
fn url(kind: RequestKind, param: Option<&str>) -> String {
    use RequestKind::*;
    let param = param.unwrap_or_default();
    match kind {
        ListLots | CreateLot => String::from("/api/lots"),
        GetLotStatus | UpdateLot | DeleteLot => format!("/api/lots/{param}"),
        ListTickets | Admit => String::from("/api/tickets"),
        ComputeFee | ArchiveTicket => format!("/api/tickets/{param}"),
        QuoteFee => format!("/api/tickets/{param}/quote"),
        ListPayments | Settle => String::from("/api/payments"),
        GetPayment => format!("/api/payments/{param}"),
    }
}

impl RawRequest for MockRawRequest {
    fn url(&self) -> &str {
        &self.url
    }

    fn method(&self) -> RequestMethod {
        use RequestKind::*;
        match self.kind {
            CreateLot | Admit | Settle => RequestMethod::Post,
            UpdateLot => RequestMethod::Put,
            DeleteLot | ArchiveTicket => RequestMethod::Delete,
            _ => RequestMethod::Get,
        }
    }

    fn read_bytes(&mut self) -> std::io::Result<Vec<u8>> {
        Ok(self.body.take().unwrap_or_default())
    }

    fn read_string(&mut self) -> std::io::Result<String> {
        String::from_utf8(self.body.take().unwrap_or_default())
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))
    }

    fn respond_with_err(self: Box<Self>, status: u16, code: &'static str, msg: String, id: Uuid) {
        let response = Response::Error {
            status,
            code,
            msg,
            id,
        };
        self.response_channel.send(response).unwrap()
    }

    fn respond_with_json(self: Box<Self>, status: u16, body: String, id: Uuid) {
        let response = Response::Json { status, body, id };
        self.response_channel.send(response).unwrap()
    }

    fn respond_with_empty(self: Box<Self>, status: u16, id: Uuid) {
        let response = Response::Empty { status, id };
        self.response_channel.send(response).unwrap()
    }
}
