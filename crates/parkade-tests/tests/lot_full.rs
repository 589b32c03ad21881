use eyre::Result;
use parkade_core::{LotUpdate, DEFAULT_LOT_ID};
use parkade_tests::TestCtxBuilder;

mod util;

#[tokio::test]
#[ntest::timeout(20_000)]
async fn test_fourth_car_is_turned_away() -> Result<()> {
    let ctx = TestCtxBuilder::from_env()?.with_capacity(3).build().await?;

    for n in 1..=3 {
        ctx.api.admit(n).await?.result?;
    }
    let lot = util::assert_occupancy(&ctx, DEFAULT_LOT_ID, 3).await?;
    assert!(lot.is_full, "A lot with every spot taken must be full.");

    util::assert_refused(ctx.api.admit(4).await?, 405, "lot_full")?;
    util::assert_occupancy(&ctx, DEFAULT_LOT_ID, 3).await?;
    assert_eq!(
        ctx.api.list_tickets().await?.result?.len(),
        3,
        "A refused admission must not leave a ticket behind."
    );

    ctx.finish().await;
    Ok(())
}

#[tokio::test]
#[ntest::timeout(20_000)]
async fn test_settlement_makes_room() -> Result<()> {
    let ctx = TestCtxBuilder::from_env()?.with_capacity(1).build().await?;

    ctx.api.admit(1).await?.result?;
    util::assert_refused(ctx.api.admit(2).await?, 405, "lot_full")?;

    ctx.api.settle(1, 1234_1234_1234_1234).await?.result?;
    util::assert_occupancy(&ctx, DEFAULT_LOT_ID, 0).await?;

    ctx.api.admit(2).await?.result?;
    util::assert_occupancy(&ctx, DEFAULT_LOT_ID, 1).await?;

    ctx.finish().await;
    Ok(())
}

#[tokio::test]
#[ntest::timeout(20_000)]
async fn test_archiving_unpaid_ticket_frees_spot() -> Result<()> {
    let ctx = TestCtxBuilder::from_env()?.with_capacity(1).build().await?;

    ctx.api.admit(1).await?.result?;
    let response = ctx.api.archive(1).await?;
    assert_eq!(response.status, 204);
    response.result?;

    util::assert_occupancy(&ctx, DEFAULT_LOT_ID, 0).await?;
    util::assert_refused(ctx.api.compute_fee(1).await?, 404, "ticket_not_found")?;

    ctx.finish().await;
    Ok(())
}

#[tokio::test]
#[ntest::timeout(20_000)]
async fn test_lots_are_independent() -> Result<()> {
    let ctx = TestCtxBuilder::from_env()?.with_capacity(1).build().await?;

    let garage = ctx.api.create_lot("Garage", 2).await?;
    assert_eq!(garage.status, 201);
    let garage = garage.result?;
    assert_eq!(garage.spots_used, 0);

    ctx.api.admit(1).await?.result?;
    ctx.api.admit_into(2, garage.id).await?.result?;
    ctx.api.admit_into(3, garage.id).await?.result?;
    util::assert_refused(ctx.api.admit_into(4, garage.id).await?, 405, "lot_full")?;

    util::assert_occupancy(&ctx, DEFAULT_LOT_ID, 1).await?;
    util::assert_occupancy(&ctx, garage.id, 2).await?;

    ctx.api.settle(2, 1234_1234_1234_1234).await?.result?;
    util::assert_occupancy(&ctx, DEFAULT_LOT_ID, 1).await?;
    util::assert_occupancy(&ctx, garage.id, 1).await?;

    let lots = ctx.api.list_lots().await?.result?;
    assert_eq!(lots.len(), 2);

    ctx.finish().await;
    Ok(())
}

#[tokio::test]
#[ntest::timeout(20_000)]
async fn test_unknown_and_deleted_lots() -> Result<()> {
    let ctx = TestCtxBuilder::from_env()?.build().await?;

    util::assert_refused(ctx.api.lot_status(42).await?, 404, "lot_not_found")?;
    util::assert_refused(ctx.api.admit_into(1, 42).await?, 404, "lot_not_found")?;
    util::assert_refused(ctx.api.create_lot("Nowhere", 0).await?, 400, "invalid_lot")?;

    let annex = ctx.api.create_lot("Annex", 5).await?.result?;
    ctx.api.delete_lot(annex.id).await?.result?;
    util::assert_refused(ctx.api.lot_status(annex.id).await?, 404, "lot_not_found")?;
    util::assert_refused(ctx.api.admit_into(1, annex.id).await?, 404, "lot_not_found")?;

    ctx.finish().await;
    Ok(())
}

#[tokio::test]
#[ntest::timeout(20_000)]
async fn test_stale_ticket_of_deleted_lot() -> Result<()> {
    let ctx = TestCtxBuilder::from_env()?.build().await?;

    let annex = ctx.api.create_lot("Annex", 2).await?.result?;
    ctx.api.admit_into(1, annex.id).await?.result?;
    ctx.api.delete_lot(annex.id).await?.result?;

    let fresh = ctx.api.create_lot("Fresh", 2).await?.result?;
    assert_ne!(fresh.id, annex.id, "A deleted lot's id must not be handed out again.");
    ctx.api.admit_into(2, fresh.id).await?.result?;

    util::assert_refused(
        ctx.api.settle(1, 1234_1234_1234_1234).await?,
        404,
        "lot_not_found",
    )?;
    util::assert_occupancy(&ctx, fresh.id, 1).await?;

    ctx.finish().await;
    Ok(())
}

#[tokio::test]
#[ntest::timeout(20_000)]
async fn test_lot_update() -> Result<()> {
    let ctx = TestCtxBuilder::from_env()?.with_capacity(3).build().await?;

    ctx.api.admit(1).await?.result?;
    ctx.api.admit(2).await?.result?;

    let rename = LotUpdate {
        name: Some(String::from("North Deck")),
        capacity: None,
    };
    let lot = ctx.api.update_lot(DEFAULT_LOT_ID, &rename).await?.result?;
    assert_eq!(lot.name, "North Deck");
    assert_eq!(lot.capacity, 3);

    let shrink = LotUpdate {
        name: None,
        capacity: Some(1),
    };
    util::assert_refused(
        ctx.api.update_lot(DEFAULT_LOT_ID, &shrink).await?,
        400,
        "invalid_lot",
    )?;
    let lot = util::assert_occupancy(&ctx, DEFAULT_LOT_ID, 2).await?;
    assert_eq!(lot.capacity, 3, "A refused update must leave the lot alone.");

    let shrink = LotUpdate {
        name: None,
        capacity: Some(2),
    };
    let lot = ctx.api.update_lot(DEFAULT_LOT_ID, &shrink).await?.result?;
    assert!(lot.is_full, "Shrinking to the occupancy fills the lot.");
    util::assert_refused(ctx.api.admit(3).await?, 405, "lot_full")?;

    let grow = LotUpdate {
        name: None,
        capacity: Some(4),
    };
    ctx.api.update_lot(DEFAULT_LOT_ID, &grow).await?.result?;
    ctx.api.admit(3).await?.result?;
    let lot = util::assert_occupancy(&ctx, DEFAULT_LOT_ID, 3).await?;
    assert_eq!(lot.name, "North Deck");

    util::assert_refused(
        ctx.api.update_lot(42, &grow).await?,
        404,
        "lot_not_found",
    )?;

    ctx.finish().await;
    Ok(())
}
