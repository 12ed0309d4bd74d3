use bookrev_app::error::ApiMessage;
use bookrev_app::rest_api::Page;
use bookrev_dal::review::ReviewRecord;
use bookrev_e2e_tests::rest::{
    get_book, get_review, review_payload, submit_review, submit_review_open, with_user,
};
use bookrev_e2e_tests::{TEST_USER_GUID, TestUser, extend_url, launch_env, now, prepare_env};
use tracing::info;
use tracing_test::traced_test;

#[tokio::test]
#[traced_test]
async fn test_review_lifecycle() {
    let (args, _config_guard) = prepare_env("test_review_lifecycle").await.unwrap();
    let base_url = args.base_url.clone();
    let (client, _) = launch_env(args, TestUser::User).await.unwrap();

    let message = submit_review(
        &client,
        &base_url,
        &review_payload("book-1", "put", "Great narration", 4.0, 5.0),
    )
    .await
    .unwrap();
    assert_eq!(message.code, 200);
    assert_eq!(message.message, "Comment added successfully.");

    let book = get_book(&client, &base_url, "book-1").await.unwrap();
    assert_eq!(book.book_rate, 4.0);
    assert_eq!(book.book_rate_number, 1);
    assert_eq!(book.narrator_rate, 5.0);
    assert_eq!(book.overall_rate, 4.5);
    assert_eq!(book.number_of_comments, 1);

    let comment_guid = format!("book-1_{}", TEST_USER_GUID);
    let record = get_review(&client, &base_url, &comment_guid).await.unwrap();
    assert_eq!(record.user_guid, TEST_USER_GUID);
    assert_eq!(record.comment, "Great narration");
    assert!(record.is_there_comment);
    assert!(!record.is_edited);
    assert_eq!(record.version, 1);
    let time_diff = now() - record.created;
    assert!(time::Duration::seconds(5) > time_diff);

    let api_url = base_url.join("api/review").unwrap();

    let response = client
        .post(api_url.clone())
        .json(&review_payload("book-1", "put", "Second thoughts", 3.0, 3.0))
        .send()
        .await
        .unwrap();
    info!("Response: {:#?}", response);
    assert_eq!(response.status().as_u16(), 409);
    let body: ApiMessage = response.json().await.unwrap();
    assert_eq!(body.code, 409);
    assert_eq!(body.message, "User has already commented on this book.");

    let message = submit_review(
        &client,
        &base_url,
        &review_payload("book-1", "update", "Even better on a second listen", 5.0, 4.0),
    )
    .await
    .unwrap();
    assert_eq!(message.message, "Comment updated successfully.");

    let record = get_review(&client, &base_url, &comment_guid).await.unwrap();
    assert!(record.is_edited);
    assert_eq!(record.book_rate, 5.0);
    assert_eq!(record.narrator_rate, 4.0);

    let book = get_book(&client, &base_url, "book-1").await.unwrap();
    assert_eq!(book.book_rate, 5.0);
    assert_eq!(book.narrator_rate, 4.0);
    assert_eq!(book.overall_rate, 4.5);
    assert_eq!(book.number_of_comments, 1);

    let message = submit_review(
        &client,
        &base_url,
        &review_payload("book-1", "delete", "", 0.0, 0.0),
    )
    .await
    .unwrap();
    assert_eq!(message.message, "Comment deleted successfully.");

    let book = get_book(&client, &base_url, "book-1").await.unwrap();
    assert_eq!(book.book_rate, 0.0);
    assert_eq!(book.book_rate_number, 0);
    assert_eq!(book.overall_rate, 0.0);
    assert_eq!(book.number_of_comments, 0);

    let message = submit_review(
        &client,
        &base_url,
        &review_payload("book-1", "delete", "", 0.0, 0.0),
    )
    .await
    .unwrap();
    assert_eq!(message.message, "Comment is already deleted.");

    // Soft deleted review is no longer served
    let response = client
        .get(extend_url(&api_url, &comment_guid))
        .send()
        .await
        .unwrap();
    info!("Response: {:#?}", response);
    assert_eq!(response.status().as_u16(), 508);
    let body: ApiMessage = response.json().await.unwrap();
    assert_eq!(body.message, "Comment does not exist.");

    let response = client
        .post(api_url.clone())
        .json(&review_payload("book-1", "update", "Lost words", 1.0, 1.0))
        .send()
        .await
        .unwrap();
    info!("Response: {:#?}", response);
    assert_eq!(response.status().as_u16(), 409);
    let body: ApiMessage = response.json().await.unwrap();
    assert_eq!(
        body.message,
        "Cannot update a deleted comment. Please restore it first."
    );

    let message = submit_review(
        &client,
        &base_url,
        &review_payload("book-1", "put", "Back for a relisten", 3.0, 0.0),
    )
    .await
    .unwrap();
    assert_eq!(message.message, "Comment restored successfully.");

    let book = get_book(&client, &base_url, "book-1").await.unwrap();
    assert_eq!(book.book_rate, 3.0);
    assert_eq!(book.narrator_rate, 0.0);
    assert_eq!(book.narrator_rate_number, 0);
    assert_eq!(book.overall_rate, 3.0);
    assert_eq!(book.number_of_comments, 1);
}

#[tokio::test]
#[traced_test]
async fn test_open_review_requires_user() {
    let (args, _config_guard) = prepare_env("test_open_review_requires_user")
        .await
        .unwrap();
    let base_url = args.base_url.clone();
    let (client, _) = launch_env(args, TestUser::Anonymous).await.unwrap();

    let open_url = base_url.join("api/noauth/review").unwrap();
    let response = client
        .post(open_url)
        .json(&review_payload("book-2", "put", "Anonymous praise", 4.0, 0.0))
        .send()
        .await
        .unwrap();
    info!("Response: {:#?}", response);
    assert_eq!(response.status().as_u16(), 400);
    let body: ApiMessage = response.json().await.unwrap();
    assert_eq!(body.code, 400);
    assert_eq!(body.message, "Missing required fields");

    let message = submit_review_open(
        &client,
        &base_url,
        &with_user(
            review_payload("book-2", "put", "Anonymous praise", 4.0, 0.0),
            "reader-1",
        ),
    )
    .await
    .unwrap();
    assert_eq!(message.message, "Comment added successfully.");

    // Aggregate and review reads need no token
    let book = get_book(&client, &base_url, "book-2").await.unwrap();
    assert_eq!(book.book_rate, 4.0);
    assert_eq!(book.number_of_comments, 1);
    let record = get_review(&client, &base_url, "book-2_reader-1")
        .await
        .unwrap();
    assert_eq!(record.user_guid, "reader-1");
}

#[tokio::test]
#[traced_test]
async fn test_review_paging() {
    let (args, _config_guard) = prepare_env("test_review_paging").await.unwrap();
    let base_url = args.base_url.clone();
    let (client, _) = launch_env(args, TestUser::Anonymous).await.unwrap();

    for rate in 1..=5 {
        let user = format!("reader-{rate}");
        let comment = format!("Rated {rate}");
        submit_review_open(
            &client,
            &base_url,
            &with_user(
                review_payload("book-7", "put", &comment, rate as f64, 0.0),
                &user,
            ),
        )
        .await
        .unwrap();
    }

    let list_url = base_url.join("api/book/book-7/reviews").unwrap();

    let get_page = async |page: u32| {
        let mut page_url = list_url.clone();
        let query = format!("page={page}&page_size=2&sort=-book_rate");
        page_url.set_query(Some(&query));
        let response = client.get(page_url).send().await.unwrap();
        info!("Response: {:#?}", response);
        assert!(response.status().is_success());
        let page: Page<ReviewRecord> = response.json().await.unwrap();
        page
    };

    let page = get_page(1).await;
    assert_eq!(page.total, 5);
    assert_eq!(page.total_pages, 3);
    assert_eq!(page.rows.len(), 2);
    assert_eq!(page.rows[0].book_rate, 5.0);
    assert_eq!(page.rows[1].book_rate, 4.0);

    let page = get_page(3).await;
    assert_eq!(page.page, 3);
    assert_eq!(page.rows.len(), 1);
    assert_eq!(page.rows[0].book_rate, 1.0);

    // Ordering is restricted to known fields
    let mut bad_url = list_url.clone();
    bad_url.set_query(Some("sort=user_guid"));
    let response = client.get(bad_url).send().await.unwrap();
    info!("Response: {:#?}", response);
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
#[traced_test]
async fn test_review_validation() {
    let (args, _config_guard) = prepare_env("test_review_validation").await.unwrap();
    let base_url = args.base_url.clone();
    let (client, _) = launch_env(args, TestUser::User).await.unwrap();

    let api_url = base_url.join("api/review").unwrap();

    let response = client
        .post(api_url.clone())
        .json(&review_payload("book-1", "promote", "Nope", 1.0, 1.0))
        .send()
        .await
        .unwrap();
    info!("Response: {:#?}", response);
    assert_eq!(response.status().as_u16(), 400);

    let response = client
        .post(api_url.clone())
        .json(&review_payload("book-1", "put", &"a".repeat(2001), 1.0, 1.0))
        .send()
        .await
        .unwrap();
    info!("Response: {:#?}", response);
    assert_eq!(response.status().as_u16(), 400);

    let response = client
        .post(api_url.clone())
        .json(&review_payload("book-1", "put", "Off the scale", 9.0, 1.0))
        .send()
        .await
        .unwrap();
    info!("Response: {:#?}", response);
    assert_eq!(response.status().as_u16(), 400);
}
