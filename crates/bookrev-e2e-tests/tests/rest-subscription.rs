use bookrev_app::error::ApiMessage;
use bookrev_app::rest_api::Page;
use bookrev_dal::subscription::{MigrationRequest, Subscription};
use bookrev_e2e_tests::{TEST_USER_GUID, TestUser, launch_env, now, prepare_env};
use serde_json::json;
use tracing::info;
use tracing_test::traced_test;

fn subscription_payload(subscription_id: &str, amount: f64) -> serde_json::Value {
    json!({
        "subscription_id": subscription_id,
        "amount_paid": amount,
        "payment_method": "telebirr",
        "duration": "monthly",
        "account_sent_to": "0911-222-333",
        "phone_number_sent_from": "0911-444-555",
        "photo_link": "receipts/2025/08/receipt-1.jpg",
    })
}

#[tokio::test]
#[traced_test]
async fn test_subscription_intake() {
    let (args, _config_guard) = prepare_env("test_subscription_intake").await.unwrap();
    let base_url = args.base_url.clone();
    let (client, _) = launch_env(args, TestUser::User).await.unwrap();

    let api_url = base_url.join("api/subscription").unwrap();

    let response = client
        .post(api_url.clone())
        .json(&subscription_payload("sub-100", 150.0))
        .send()
        .await
        .unwrap();
    info!("Response: {:#?}", response);
    assert_eq!(response.status().as_u16(), 201);
    let record: Subscription = response.json().await.unwrap();
    assert_eq!(record.user_guid, TEST_USER_GUID);
    assert_eq!(record.subscription_id, "sub-100");
    assert_eq!(record.amount_paid, 150.0);
    assert_eq!(record.status, "pending");
    assert_eq!(record.version, 1);
    let time_diff = now() - record.created;
    assert!(time::Duration::seconds(5) > time_diff);

    let response = client
        .post(api_url.clone())
        .json(&subscription_payload("sub-101", 90.0))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);

    let mut list_url = api_url.clone();
    list_url.set_query(Some("sort=-amount_paid"));
    let response = client.get(list_url).send().await.unwrap();
    info!("Response: {:#?}", response);
    assert!(response.status().is_success());
    let page: Page<Subscription> = response.json().await.unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(page.rows[0].amount_paid, 150.0);
    assert_eq!(page.rows[1].amount_paid, 90.0);
}

#[tokio::test]
#[traced_test]
async fn test_open_subscription_intake() {
    let (args, _config_guard) = prepare_env("test_open_subscription_intake")
        .await
        .unwrap();
    let base_url = args.base_url.clone();
    let (client, _) = launch_env(args, TestUser::Anonymous).await.unwrap();

    let open_url = base_url.join("api/noauth/subscription").unwrap();

    // Actor guid is required on the open endpoint
    let response = client
        .post(open_url.clone())
        .json(&subscription_payload("sub-200", 60.0))
        .send()
        .await
        .unwrap();
    info!("Response: {:#?}", response);
    assert_eq!(response.status().as_u16(), 400);
    let body: ApiMessage = response.json().await.unwrap();
    assert_eq!(body.message, "Missing required fields");

    let mut payload = subscription_payload("sub-200", 60.0);
    payload["user_guid"] = json!("reader-1");
    let response = client
        .post(open_url)
        .json(&payload)
        .send()
        .await
        .unwrap();
    info!("Response: {:#?}", response);
    assert_eq!(response.status().as_u16(), 201);
    let record: Subscription = response.json().await.unwrap();
    assert_eq!(record.user_guid, "reader-1");
    assert_eq!(record.status, "pending");

    // Listing stays behind the token
    let list_url = base_url.join("api/subscription").unwrap();
    let response = client.get(list_url).send().await.unwrap();
    info!("Response: {:#?}", response);
    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
#[traced_test]
async fn test_migration_restore_intake() {
    let (args, _config_guard) = prepare_env("test_migration_restore_intake")
        .await
        .unwrap();
    let base_url = args.base_url.clone();
    let (client, _) = launch_env(args, TestUser::User).await.unwrap();

    let api_url = base_url.join("api/subscription/migration").unwrap();

    let payload = json!({
        "subscription_id": "sub-300",
        "country_code": "ET",
        "end_date_of_subscription": "2026-01-31",
        "photo_link": "receipts/2025/08/receipt-2.jpg",
    });
    let response = client
        .post(api_url.clone())
        .json(&payload)
        .send()
        .await
        .unwrap();
    info!("Response: {:#?}", response);
    assert_eq!(response.status().as_u16(), 201);
    let record: MigrationRequest = response.json().await.unwrap();
    assert_eq!(record.user_guid, TEST_USER_GUID);
    assert_eq!(record.subscription_id, "sub-300");
    assert_eq!(record.country_code, "ET");
    assert_eq!(record.status, "pending");

    let response = client.get(api_url).send().await.unwrap();
    info!("Response: {:#?}", response);
    assert!(response.status().is_success());
    let page: Page<MigrationRequest> = response.json().await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.rows[0].end_date_of_subscription, "2026-01-31");
}

#[tokio::test]
#[traced_test]
async fn test_subscription_validation() {
    let (args, _config_guard) = prepare_env("test_subscription_validation")
        .await
        .unwrap();
    let base_url = args.base_url.clone();
    let (client, _) = launch_env(args, TestUser::User).await.unwrap();

    let api_url = base_url.join("api/subscription").unwrap();

    let response = client
        .post(api_url.clone())
        .json(&subscription_payload("sub-400", -5.0))
        .send()
        .await
        .unwrap();
    info!("Response: {:#?}", response);
    assert_eq!(response.status().as_u16(), 400);

    let mut payload = subscription_payload("sub-401", 10.0);
    payload["photo_link"] = json!("");
    let response = client.post(api_url).json(&payload).send().await.unwrap();
    info!("Response: {:#?}", response);
    assert_eq!(response.status().as_u16(), 400);
}
