use eyre::Result;
use parkade_core::{CardNumber, Payment, RequestKind, DEFAULT_LOT_ID};
use parkade_tests::TestCtxBuilder;
use uuid::Uuid;

mod util;

const CARD_16: u128 = 1234_1234_1234_1234;
const CARD_20: u128 = 1234_1234_1234_1234_1234;

#[tokio::test]
#[ntest::timeout(20_000)]
async fn test_unknown_ticket() -> Result<()> {
    let ctx = TestCtxBuilder::from_env()?.build().await?;

    util::assert_refused(ctx.api.settle(99, CARD_16).await?, 404, "ticket_not_found")?;
    assert!(ctx.api.list_payments().await?.result?.is_empty());

    ctx.finish().await;
    Ok(())
}

#[tokio::test]
#[ntest::timeout(20_000)]
async fn test_ticket_is_paid_once() -> Result<()> {
    let ctx = TestCtxBuilder::from_env()?.build().await?;

    ctx.api.admit(5).await?.result?;
    let payment = ctx.api.settle(5, CARD_20).await?;
    assert_eq!(payment.status, 201);
    payment.result?;

    util::assert_refused(ctx.api.settle(5, CARD_16).await?, 405, "already_paid")?;
    util::assert_occupancy(&ctx, DEFAULT_LOT_ID, 0).await?;
    assert_eq!(ctx.api.list_payments().await?.result?.len(), 1);

    ctx.finish().await;
    Ok(())
}

#[tokio::test]
#[ntest::timeout(20_000)]
async fn test_card_formats() -> Result<()> {
    let ctx = TestCtxBuilder::from_env()?.build().await?;

    ctx.api.admit(1).await?.result?;
    for card in [1234_1234_1234_123, 1234_1234_1234_1234_1, 12] {
        util::assert_refused(ctx.api.settle(1, card).await?, 400, "invalid_card_format")?;
    }
    util::assert_occupancy(&ctx, DEFAULT_LOT_ID, 1).await?;
    assert!(
        !ctx.api.compute_fee(1).await?.result?.is_paid,
        "A refused card must leave the ticket unpaid."
    );

    ctx.api.settle(1, CARD_16).await?.result?;

    ctx.api.admit(2).await?.result?;
    ctx.api.settle(2, CARD_20).await?.result?;

    util::assert_occupancy(&ctx, DEFAULT_LOT_ID, 0).await?;

    ctx.finish().await;
    Ok(())
}

#[tokio::test]
#[ntest::timeout(20_000)]
async fn test_card_past_u64_settles() -> Result<()> {
    let ctx = TestCtxBuilder::from_env()?.build().await?;
    let card = CardNumber(9876_5432_1098_7654_3210);
    assert!(card.0 > u128::from(u64::MAX));

    ctx.api.admit(1).await?.result?;
    let response = ctx
        .api
        .send_raw::<Payment>(
            RequestKind::Settle,
            None,
            r#"{"ticketNumber": 1, "cardNumber": 98765432109876543210}"#,
        )
        .await?;
    assert_eq!(response.status, 201);
    let payment = response.result?;
    assert_eq!(payment.card_number, card);

    let stored = ctx.api.payment(payment.id).await?.result?;
    assert_eq!(stored.card_number, card, "The card must be kept digit for digit.");
    let listed = ctx.api.list_payments().await?.result?;
    assert_eq!(listed, vec![payment]);
    util::assert_occupancy(&ctx, DEFAULT_LOT_ID, 0).await?;

    ctx.finish().await;
    Ok(())
}

#[tokio::test]
#[ntest::timeout(20_000)]
async fn test_malformed_requests() -> Result<()> {
    let ctx = TestCtxBuilder::from_env()?.build().await?;

    let response = ctx
        .api
        .send_raw::<()>(RequestKind::Settle, None, r#"{"ticketNumber": "one"}"#)
        .await?;
    util::assert_refused(response, 400, "bad_request")?;

    let response = ctx
        .api
        .send_raw::<()>(RequestKind::ComputeFee, Some(String::from("seven")), "")
        .await?;
    util::assert_refused(response, 400, "bad_request")?;

    util::assert_refused(
        ctx.api.payment(Uuid::new_v4()).await?,
        404,
        "payment_not_found",
    )?;

    ctx.finish().await;
    Ok(())
}

#[tokio::test]
#[ntest::timeout(20_000)]
async fn test_duplicate_ticket_number() -> Result<()> {
    let ctx = TestCtxBuilder::from_env()?.build().await?;

    ctx.api.admit(7).await?.result?;
    util::assert_refused(ctx.api.admit(7).await?, 409, "ticket_exists")?;
    util::assert_occupancy(&ctx, DEFAULT_LOT_ID, 1).await?;

    // Once paid, the number may be handed out again
    ctx.api.settle(7, CARD_16).await?.result?;
    ctx.api.admit(7).await?.result?;
    util::assert_occupancy(&ctx, DEFAULT_LOT_ID, 1).await?;

    ctx.finish().await;
    Ok(())
}
