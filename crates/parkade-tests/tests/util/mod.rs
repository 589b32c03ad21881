use eyre::{eyre, Result};
use parkade_core::{Lot, LotId};
use parkade_tests::{ApiResponse, TestCtx};

/// Checks that `lot_id` reports `spots_used` occupied spots.
#[allow(unused)]
pub async fn assert_occupancy(ctx: &TestCtx, lot_id: LotId, spots_used: u32) -> Result<Lot> {
    let lot = ctx.api.lot_status(lot_id).await?.result?;
    assert_eq!(
        lot.spots_used, spots_used,
        "Lot {lot_id} must have {spots_used} spots in use, the facility reports {}.",
        lot.spots_used
    );
    assert_eq!(
        lot.is_full,
        lot.spots_used == lot.capacity,
        "`isFull` of lot {lot_id} must agree with its occupancy."
    );
    Ok(lot)
}

/// Checks that the request was refused with `status` and `code`.
#[allow(unused)]
pub fn assert_refused<T>(response: ApiResponse<T>, status: u16, code: &str) -> Result<()> {
    match response.result {
        Ok(_) => Err(eyre!(
            "The request must be refused with {status} `{code}`, it succeeded with {}.",
            response.status
        )),
        Err(err) => {
            assert_eq!(err.status, status, "Unexpected status for `{}`.", err.code);
            assert_eq!(err.code, code, "Unexpected error code: {err}");
            Ok(())
        }
    }
}
