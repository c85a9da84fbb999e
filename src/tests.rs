#[cfg(test)]
mod integration_tests {
    use std::str::FromStr;

    use crate::test_utils::test_utils::{
        bearer, category_id, register_user, setup_test_app, setup_test_server, setup_test_server_with,
        test_settings, TEST_PASSWORD,
    };
    use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
    use axum::http::{HeaderName, HeaderValue, StatusCode};
    use axum_test::TestServer;
    use chrono::{Datelike, Months};
    use model::entities::{access_attempt, saving_movement};
    use rust_decimal::Decimal;
    use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
    use serde_json::{json, Value};

    fn dec(value: &Value) -> Decimal {
        Decimal::from_str(value.as_str().expect("decimal serialized as string")).unwrap()
    }

    fn forwarded_for(ip: &str) -> (HeaderName, HeaderValue) {
        (HeaderName::from_static("x-forwarded-for"), HeaderValue::from_str(ip).unwrap())
    }

    async fn create_expense(server: &TestServer, token: &str, body: Value) -> Value {
        let response = server
            .post("/api/v1/expenses")
            .add_header(AUTHORIZATION, bearer(token))
            .json(&body)
            .await;
        response.assert_status(StatusCode::CREATED);
        response.json::<Value>()["data"].clone()
    }

    async fn create_saving(server: &TestServer, token: &str, name: &str, target: &str) -> Value {
        let response = server
            .post("/api/v1/savings")
            .add_header(AUTHORIZATION, bearer(token))
            .json(&json!({ "name": name, "target_amount": target, "currency": "ARS" }))
            .await;
        response.assert_status(StatusCode::CREATED);
        response.json::<Value>()["data"].clone()
    }

    #[tokio::test]
    async fn test_health_check() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let response = server.get("/health").await;

        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["database"], "connected");
    }

    #[tokio::test]
    async fn test_register_and_profile() {
        let (server, _) = setup_test_server().await;
        let token = register_user(&server, "ana").await;

        let response = server.get("/api/v1/auth/profile").add_header(AUTHORIZATION, bearer(&token)).await;
        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["data"]["username"], "ana");
        assert_eq!(body["data"]["default_currency"], "ARS");
        assert_eq!(body["data"]["alert_threshold"], 80);

        let response = server
            .put("/api/v1/auth/profile")
            .add_header(AUTHORIZATION, bearer(&token))
            .json(&json!({ "first_name": "Ana", "default_currency": "USD", "alert_threshold": 90 }))
            .await;
        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["data"]["first_name"], "Ana");
        assert_eq!(body["data"]["default_currency"], "USD");
        assert_eq!(body["data"]["alert_threshold"], 90);
    }

    #[tokio::test]
    async fn test_register_rejects_duplicates_and_bad_passwords() {
        let (server, _) = setup_test_server().await;
        register_user(&server, "ana").await;

        let response = server
            .post("/api/v1/auth/register")
            .json(&json!({
                "username": "ana",
                "email": "other@example.com",
                "password": TEST_PASSWORD,
                "password_confirm": TEST_PASSWORD,
            }))
            .await;
        response.assert_status(StatusCode::CONFLICT);
        assert_eq!(response.json::<Value>()["code"], "CONFLICT");

        let response = server
            .post("/api/v1/auth/register")
            .json(&json!({
                "username": "bruno",
                "email": "bruno@example.com",
                "password": TEST_PASSWORD,
                "password_confirm": "different-password",
            }))
            .await;
        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(response.json::<Value>()["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_requests_without_token_are_rejected() {
        let (server, _) = setup_test_server().await;

        let response = server.get("/api/v1/expenses").await;
        response.assert_status(StatusCode::UNAUTHORIZED);

        let response = server
            .get("/api/v1/expenses")
            .add_header(AUTHORIZATION, bearer("not-a-token"))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(response.json::<Value>()["success"], false);
    }

    #[tokio::test]
    async fn test_login_and_lockout() {
        let (server, _) = setup_test_server().await;
        register_user(&server, "ana").await;
        let (name, value) = forwarded_for("10.0.0.7");

        let response = server
            .post("/api/v1/auth/login")
            .add_header(name.clone(), value.clone())
            .json(&json!({ "username": "ANA@example.com", "password": TEST_PASSWORD }))
            .await;
        response.assert_status(StatusCode::OK);
        assert_eq!(response.json::<Value>()["data"]["token_type"], "Bearer");

        // The test limit is three failures
        for _ in 0..2 {
            let response = server
                .post("/api/v1/auth/login")
                .add_header(name.clone(), value.clone())
                .json(&json!({ "username": "ana", "password": "wrong-password" }))
                .await;
            response.assert_status(StatusCode::UNAUTHORIZED);
        }
        let response = server
            .post("/api/v1/auth/login")
            .add_header(name.clone(), value.clone())
            .json(&json!({ "username": "ana", "password": "wrong-password" }))
            .await;
        response.assert_status(StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.json::<Value>()["code"], "TOO_MANY_ATTEMPTS");

        // Correct credentials stay refused during the cool-off
        let response = server
            .post("/api/v1/auth/login")
            .add_header(name, value)
            .json(&json!({ "username": "ana", "password": TEST_PASSWORD }))
            .await;
        response.assert_status(StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_lockout_follows_account_across_logins_and_addresses() {
        let mut settings = test_settings();
        settings.auth.trusted_proxies = 1;
        let (server, state) = setup_test_server_with(settings).await;
        register_user(&server, "ana").await;

        // Each attempt arrives through the proxy from a different address
        let attempts = [
            ("ana", "198.51.100.1"),
            ("ana@example.com", "198.51.100.2"),
            ("ANA", "198.51.100.3"),
            ("ana@example.com", "198.51.100.4"),
        ];
        let mut statuses = Vec::new();
        for (login, ip) in attempts {
            let (name, value) = forwarded_for(&format!("203.0.113.9, {}", ip));
            let response = server
                .post("/api/v1/auth/login")
                .add_header(name, value)
                .json(&json!({ "username": login, "password": "wrong-password" }))
                .await;
            statuses.push(response.status_code());
        }
        assert_eq!(
            statuses,
            vec![
                StatusCode::UNAUTHORIZED,
                StatusCode::UNAUTHORIZED,
                StatusCode::TOO_MANY_REQUESTS,
                StatusCode::TOO_MANY_REQUESTS,
            ]
        );

        let counters = access_attempt::Entity::find().all(&state.db).await.unwrap();
        assert!(counters.iter().all(|c| c.username == "ana"));
        assert!(counters.iter().all(|c| c.ip_address.starts_with("198.51.100.")));
    }

    #[tokio::test]
    async fn test_spoofed_forwarded_header_does_not_reset_address_counter() {
        let (server, state) = setup_test_server().await;

        // No trusted proxies: the header is ignored, every attempt shares one address
        for (i, login) in ["nadie", "otro", "tercero"].iter().enumerate() {
            let (name, value) = forwarded_for(&format!("192.0.2.{}", i + 1));
            let response = server
                .post("/api/v1/auth/login")
                .add_header(name, value)
                .json(&json!({ "username": login, "password": "wrong-password" }))
                .await;
            if i < 2 {
                response.assert_status(StatusCode::UNAUTHORIZED);
            } else {
                response.assert_status(StatusCode::TOO_MANY_REQUESTS);
            }
        }

        let counters = access_attempt::Entity::find().all(&state.db).await.unwrap();
        assert_eq!(counters.len(), 3);
        assert!(counters.iter().all(|c| !c.ip_address.starts_with("192.0.2.")));
    }

    #[tokio::test]
    async fn test_change_password() {
        let (server, _) = setup_test_server().await;
        let token = register_user(&server, "ana").await;

        let response = server
            .post("/api/v1/auth/password")
            .add_header(AUTHORIZATION, bearer(&token))
            .json(&json!({
                "old_password": "wrong-password",
                "new_password": "An0therPassword!",
                "new_password_confirm": "An0therPassword!",
            }))
            .await;
        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);

        let response = server
            .post("/api/v1/auth/password")
            .add_header(AUTHORIZATION, bearer(&token))
            .json(&json!({
                "old_password": TEST_PASSWORD,
                "new_password": "An0therPassword!",
                "new_password_confirm": "An0therPassword!",
            }))
            .await;
        response.assert_status(StatusCode::OK);

        let response = server
            .post("/api/v1/auth/login")
            .json(&json!({ "username": "ana", "password": "An0therPassword!" }))
            .await;
        response.assert_status(StatusCode::OK);
    }

    #[tokio::test]
    async fn test_categories_ownership() {
        let (server, _) = setup_test_server().await;
        let ana = register_user(&server, "ana").await;
        let bruno = register_user(&server, "bruno").await;

        let response = server
            .get("/api/v1/categories")
            .add_query_param("type", "INCOME")
            .add_header(AUTHORIZATION, bearer(&ana))
            .await;
        let body: Value = response.json();
        let incomes = body["data"].as_array().unwrap();
        assert!(!incomes.is_empty());
        assert!(incomes.iter().all(|c| c["type"] == "INCOME" && c["is_system"] == true));

        let response = server
            .post("/api/v1/categories")
            .add_header(AUTHORIZATION, bearer(&ana))
            .json(&json!({ "name": "Mascotas", "type": "EXPENSE", "icon": "bi-heart" }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let own_id = response.json::<Value>()["data"]["id"].as_i64().unwrap();

        let response = server
            .post("/api/v1/categories")
            .add_header(AUTHORIZATION, bearer(&ana))
            .json(&json!({ "name": "mascotas", "type": "EXPENSE" }))
            .await;
        response.assert_status(StatusCode::CONFLICT);

        let response = server
            .get(&format!("/api/v1/categories/{}", own_id))
            .add_header(AUTHORIZATION, bearer(&bruno))
            .await;
        response.assert_status(StatusCode::NOT_FOUND);

        let system_id = category_id(&server, &ana, "Transporte").await;
        let response = server
            .put(&format!("/api/v1/categories/{}", system_id))
            .add_header(AUTHORIZATION, bearer(&ana))
            .json(&json!({ "name": "Viajes", "type": "EXPENSE" }))
            .await;
        response.assert_status(StatusCode::FORBIDDEN);

        let response = server
            .delete(&format!("/api/v1/categories/{}", own_id))
            .add_header(AUTHORIZATION, bearer(&ana))
            .await;
        response.assert_status(StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_expense_crud_and_usd_conversion() {
        let (server, _) = setup_test_server().await;
        let token = register_user(&server, "ana").await;
        let food = category_id(&server, &token, "Alimentación").await;
        let today = common::today();

        let created = create_expense(
            &server,
            &token,
            json!({
                "date": today,
                "category_id": food,
                "description": "Supermercado",
                "amount": "100.00",
                "currency": "USD",
                "exchange_rate": "1000.00",
                "payment_method": "DEBIT",
            }),
        )
        .await;
        assert_eq!(dec(&created["amount_ars"]), Decimal::from(100_000));
        assert_eq!(created["category_name"], "Alimentación");
        assert_eq!(created["payment_method"], "DEBIT");

        // USD needs a rate above one
        let response = server
            .post("/api/v1/expenses")
            .add_header(AUTHORIZATION, bearer(&token))
            .json(&json!({
                "date": today,
                "category_id": food,
                "description": "Sin cotización",
                "amount": "10",
                "currency": "USD",
            }))
            .await;
        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);

        let id = created["id"].as_i64().unwrap();
        let response = server
            .put(&format!("/api/v1/expenses/{}", id))
            .add_header(AUTHORIZATION, bearer(&token))
            .json(&json!({
                "date": today,
                "category_id": food,
                "description": "Supermercado grande",
                "amount": "2500",
                "currency": "ARS",
            }))
            .await;
        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(dec(&body["data"]["amount_ars"]), Decimal::from(2500));
        assert_eq!(dec(&body["data"]["exchange_rate"]), Decimal::ONE);

        let response = server
            .delete(&format!("/api/v1/expenses/{}", id))
            .add_header(AUTHORIZATION, bearer(&token))
            .await;
        response.assert_status(StatusCode::NO_CONTENT);

        let response = server
            .get(&format!("/api/v1/expenses/{}", id))
            .add_header(AUTHORIZATION, bearer(&token))
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_expense_list_pagination_and_totals() {
        let (server, _) = setup_test_server().await;
        let token = register_user(&server, "ana").await;
        let food = category_id(&server, &token, "Alimentación").await;
        let transport = category_id(&server, &token, "Transporte").await;
        let today = common::today();

        for i in 0..22 {
            create_expense(
                &server,
                &token,
                json!({ "date": today, "category_id": food, "description": format!("Compra {}", i), "amount": "100" }),
            )
            .await;
        }
        create_expense(
            &server,
            &token,
            json!({ "date": today, "category_id": transport, "description": "Colectivo", "amount": "50" }),
        )
        .await;

        let response = server
            .get("/api/v1/expenses")
            .add_query_param("page", 2)
            .add_header(AUTHORIZATION, bearer(&token))
            .await;
        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["data"]["expenses"]["items"].as_array().unwrap().len(), 3);
        assert_eq!(body["data"]["expenses"]["total_items"], 23);
        assert_eq!(body["data"]["expenses"]["total_pages"], 2);
        assert_eq!(dec(&body["data"]["total_ars"]), Decimal::from(2250));

        let response = server
            .get("/api/v1/expenses")
            .add_query_param("category", transport)
            .add_query_param("month", "not-a-month")
            .add_header(AUTHORIZATION, bearer(&token))
            .await;
        let body: Value = response.json();
        assert_eq!(body["data"]["expenses"]["total_items"], 1);
        assert_eq!(dec(&body["data"]["total_ars"]), Decimal::from(50));

        let response = server
            .get("/api/v1/expenses/monthly-total")
            .add_query_param("month", today.month())
            .add_query_param("year", today.year())
            .add_header(AUTHORIZATION, bearer(&token))
            .await;
        let body: Value = response.json();
        assert_eq!(dec(&body["data"]["total_ars"]), Decimal::from(2250));

        let response = server
            .get("/api/v1/expenses/by-category")
            .add_header(AUTHORIZATION, bearer(&token))
            .await;
        let body: Value = response.json();
        let shares = body["data"].as_array().unwrap();
        assert_eq!(shares.len(), 2);
        assert_eq!(shares[0]["name"], "Alimentación");

        let response = server
            .get("/api/v1/expenses/monthly-total")
            .add_query_param("month", 13)
            .add_header(AUTHORIZATION, bearer(&token))
            .await;
        assert!(response.status_code().is_client_error());
    }

    #[tokio::test]
    async fn test_expense_export_csv() {
        let (server, _) = setup_test_server().await;
        let token = register_user(&server, "ana").await;
        let food = category_id(&server, &token, "Alimentación").await;
        create_expense(
            &server,
            &token,
            json!({ "date": common::today(), "category_id": food, "description": "Verdulería", "amount": "1234.50" }),
        )
        .await;

        let response = server
            .get("/api/v1/expenses/export")
            .add_header(AUTHORIZATION, bearer(&token))
            .await;
        response.assert_status(StatusCode::OK);
        let content_type = response.headers().get(CONTENT_TYPE).unwrap().to_str().unwrap().to_string();
        assert!(content_type.starts_with("text/csv"));
        let text = response.text();
        assert!(text.contains("Date,Description,Category,Amount"));
        assert!(text.contains("Verdulería"));
    }

    #[tokio::test]
    async fn test_income_crud_and_monthly_total() {
        let (server, _) = setup_test_server().await;
        let token = register_user(&server, "ana").await;
        let salary = category_id(&server, &token, "Sueldo").await;
        let food = category_id(&server, &token, "Alimentación").await;
        let today = common::today();

        let response = server
            .post("/api/v1/incomes")
            .add_header(AUTHORIZATION, bearer(&token))
            .json(&json!({
                "date": today,
                "category_id": salary,
                "description": "Sueldo",
                "amount": "500000",
                "is_recurring": true,
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        assert_eq!(response.json::<Value>()["data"]["is_recurring"], true);

        // Expense categories cannot hold incomes
        let response = server
            .post("/api/v1/incomes")
            .add_header(AUTHORIZATION, bearer(&token))
            .json(&json!({ "date": today, "category_id": food, "description": "Mal", "amount": "10" }))
            .await;
        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);

        let response = server
            .get("/api/v1/incomes/monthly-total")
            .add_header(AUTHORIZATION, bearer(&token))
            .await;
        let body: Value = response.json();
        assert_eq!(dec(&body["data"]["total_ars"]), Decimal::from(500_000));

        let response = server
            .get("/api/v1/incomes/export")
            .add_header(AUTHORIZATION, bearer(&token))
            .await;
        response.assert_status(StatusCode::OK);
        assert!(response.text().contains("Recurring"));
    }

    #[tokio::test]
    async fn test_saving_deposit_withdraw_and_completion() {
        let (server, state) = setup_test_server().await;
        let token = register_user(&server, "ana").await;
        let saving = create_saving(&server, &token, "Vacaciones", "1000").await;
        let id = saving["id"].as_i64().unwrap();
        assert_eq!(saving["status"], "ACTIVE");

        let response = server
            .post(&format!("/api/v1/savings/{}/deposit", id))
            .add_header(AUTHORIZATION, bearer(&token))
            .json(&json!({ "amount": "400", "description": "Primer aporte" }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        assert_eq!(dec(&body["data"]["saving"]["current_amount"]), Decimal::from(400));
        assert_eq!(body["data"]["movement"]["movement_type"], "DEPOSIT");

        let response = server
            .post(&format!("/api/v1/savings/{}/withdraw", id))
            .add_header(AUTHORIZATION, bearer(&token))
            .json(&json!({ "amount": "500" }))
            .await;
        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(response.json::<Value>()["code"], "INSUFFICIENT_FUNDS");

        let response = server
            .post(&format!("/api/v1/savings/{}/withdraw", id))
            .add_header(AUTHORIZATION, bearer(&token))
            .json(&json!({ "amount": "-5" }))
            .await;
        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);

        let response = server
            .post(&format!("/api/v1/savings/{}/deposit", id))
            .add_header(AUTHORIZATION, bearer(&token))
            .json(&json!({ "amount": "600" }))
            .await;
        let body: Value = response.json();
        assert_eq!(body["data"]["saving"]["status"], "COMPLETED");
        assert_eq!(dec(&body["data"]["saving"]["progress_percentage"]), Decimal::ONE_HUNDRED);

        let movements = saving_movement::Entity::find()
            .filter(saving_movement::Column::SavingId.eq(id as i32))
            .all(&state.db)
            .await
            .unwrap();
        assert_eq!(movements.len(), 2);

        let response = server
            .get(&format!("/api/v1/savings/{}", id))
            .add_header(AUTHORIZATION, bearer(&token))
            .await;
        let body: Value = response.json();
        assert_eq!(body["data"]["movements"]["total_items"], 2);
        assert_eq!(body["data"]["movements"]["per_page"], 10);

        let response = server
            .get("/api/v1/savings")
            .add_query_param("status", "COMPLETED")
            .add_header(AUTHORIZATION, bearer(&token))
            .await;
        let body: Value = response.json();
        assert_eq!(body["data"]["savings"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"]["summary"]["completed_count"], 1);
    }

    #[tokio::test]
    async fn test_saving_other_user_not_found() {
        let (server, _) = setup_test_server().await;
        let ana = register_user(&server, "ana").await;
        let bruno = register_user(&server, "bruno").await;
        let saving = create_saving(&server, &ana, "Auto", "5000").await;
        let id = saving["id"].as_i64().unwrap();

        let response = server
            .post(&format!("/api/v1/savings/{}/deposit", id))
            .add_header(AUTHORIZATION, bearer(&bruno))
            .json(&json!({ "amount": "100" }))
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_expense_linked_to_saving_moves_balance() {
        let (server, _) = setup_test_server().await;
        let token = register_user(&server, "ana").await;
        let other = category_id(&server, &token, "Otros gastos").await;
        let saving = create_saving(&server, &token, "Fondo de emergencia", "10000").await;
        let saving_id = saving["id"].as_i64().unwrap();
        let today = common::today();

        let expense = create_expense(
            &server,
            &token,
            json!({
                "date": today,
                "category_id": other,
                "description": "Aporte al fondo",
                "amount": "1500",
                "saving_id": saving_id,
            }),
        )
        .await;
        let expense_id = expense["id"].as_i64().unwrap();

        let current = |body: Value| dec(&body["data"]["saving"]["current_amount"]);
        let detail = server
            .get(&format!("/api/v1/savings/{}", saving_id))
            .add_header(AUTHORIZATION, bearer(&token))
            .await
            .json::<Value>();
        assert_eq!(current(detail.clone()), Decimal::from(1500));
        assert_eq!(detail["data"]["movements"]["items"][0]["expense_id"], expense_id);

        // Raising the amount posts only the difference
        server
            .put(&format!("/api/v1/expenses/{}", expense_id))
            .add_header(AUTHORIZATION, bearer(&token))
            .json(&json!({
                "date": today,
                "category_id": other,
                "description": "Aporte al fondo",
                "amount": "2000",
                "saving_id": saving_id,
            }))
            .await
            .assert_status(StatusCode::OK);
        let detail = server
            .get(&format!("/api/v1/savings/{}", saving_id))
            .add_header(AUTHORIZATION, bearer(&token))
            .await
            .json::<Value>();
        assert_eq!(current(detail.clone()), Decimal::from(2000));
        assert_eq!(detail["data"]["movements"]["total_items"], 2);

        server
            .delete(&format!("/api/v1/expenses/{}", expense_id))
            .add_header(AUTHORIZATION, bearer(&token))
            .await
            .assert_status(StatusCode::NO_CONTENT);
        let detail = server
            .get(&format!("/api/v1/savings/{}", saving_id))
            .add_header(AUTHORIZATION, bearer(&token))
            .await
            .json::<Value>();
        assert_eq!(current(detail), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_budget_progress_and_summary() {
        let (server, _) = setup_test_server().await;
        let token = register_user(&server, "ana").await;
        let food = category_id(&server, &token, "Alimentación").await;
        let salary = category_id(&server, &token, "Sueldo").await;
        let today = common::today();

        let response = server
            .post("/api/v1/budgets")
            .add_header(AUTHORIZATION, bearer(&token))
            .json(&json!({ "category_id": food, "month": today.month(), "year": today.year(), "amount": "10000" }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let budget_id = response.json::<Value>()["data"]["id"].as_i64().unwrap();

        let response = server
            .post("/api/v1/budgets")
            .add_header(AUTHORIZATION, bearer(&token))
            .json(&json!({ "category_id": food, "month": today.month(), "year": today.year(), "amount": "500" }))
            .await;
        response.assert_status(StatusCode::CONFLICT);

        let response = server
            .post("/api/v1/budgets")
            .add_header(AUTHORIZATION, bearer(&token))
            .json(&json!({ "category_id": salary, "month": today.month(), "year": today.year(), "amount": "500" }))
            .await;
        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);

        create_expense(
            &server,
            &token,
            json!({ "date": today, "category_id": food, "description": "Súper", "amount": "8500" }),
        )
        .await;

        let response = server
            .get(&format!("/api/v1/budgets/{}", budget_id))
            .add_header(AUTHORIZATION, bearer(&token))
            .await;
        let body: Value = response.json();
        assert_eq!(dec(&body["data"]["budget"]["spent"]), Decimal::from(8500));
        assert_eq!(dec(&body["data"]["budget"]["percentage"]), Decimal::from(85));
        assert_eq!(body["data"]["budget"]["status"], "warning");
        assert_eq!(body["data"]["recent_expenses"].as_array().unwrap().len(), 1);

        let response = server.get("/api/v1/budgets").add_header(AUTHORIZATION, bearer(&token)).await;
        let body: Value = response.json();
        assert_eq!(body["data"]["budgets"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"]["summary"]["warning_count"], 1);

        let response = server
            .get("/api/v1/budgets/summary")
            .add_header(AUTHORIZATION, bearer(&token))
            .await;
        let body: Value = response.json();
        assert_eq!(dec(&body["data"]["total_remaining"]), Decimal::from(1500));
    }

    #[tokio::test]
    async fn test_copy_budgets_from_previous_month() {
        let (server, _) = setup_test_server().await;
        let token = register_user(&server, "ana").await;
        let food = category_id(&server, &token, "Alimentación").await;
        let transport = category_id(&server, &token, "Transporte").await;
        let today = common::today();
        let previous = today - Months::new(1);

        for (category, amount) in [(food, "10000"), (transport, "3000")] {
            server
                .post("/api/v1/budgets")
                .add_header(AUTHORIZATION, bearer(&token))
                .json(&json!({
                    "category_id": category,
                    "month": previous.month(),
                    "year": previous.year(),
                    "amount": amount,
                }))
                .await
                .assert_status(StatusCode::CREATED);
        }
        // Already budgeted this month, so it is skipped
        server
            .post("/api/v1/budgets")
            .add_header(AUTHORIZATION, bearer(&token))
            .json(&json!({ "category_id": food, "month": today.month(), "year": today.year(), "amount": "12000" }))
            .await
            .assert_status(StatusCode::CREATED);

        let response = server
            .post("/api/v1/budgets/copy")
            .add_header(AUTHORIZATION, bearer(&token))
            .json(&json!({ "month": today.month(), "year": today.year() }))
            .await;
        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["data"]["copied"], 1);
        assert_eq!(body["data"]["budgets"][0]["category_id"], transport);

        let response = server
            .post("/api/v1/budgets/copy")
            .add_header(AUTHORIZATION, bearer(&token))
            .json(&json!({}))
            .await;
        assert_eq!(response.json::<Value>()["data"]["copied"], 0);
    }

    #[tokio::test]
    async fn test_dashboard_reflects_writes() {
        let (server, _) = setup_test_server().await;
        let token = register_user(&server, "ana").await;
        let food = category_id(&server, &token, "Alimentación").await;
        let salary = category_id(&server, &token, "Sueldo").await;
        let today = common::today();

        server
            .post("/api/v1/incomes")
            .add_header(AUTHORIZATION, bearer(&token))
            .json(&json!({ "date": today, "category_id": salary, "description": "Sueldo", "amount": "100000" }))
            .await
            .assert_status(StatusCode::CREATED);

        let response = server
            .get("/api/v1/reports/dashboard")
            .add_header(AUTHORIZATION, bearer(&token))
            .await;
        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(dec(&body["data"]["balance"]["income_total"]), Decimal::from(100_000));
        assert_eq!(dec(&body["data"]["balance"]["expense_total"]), Decimal::ZERO);

        create_expense(
            &server,
            &token,
            json!({ "date": today, "category_id": food, "description": "Súper", "amount": "25000" }),
        )
        .await;

        // The write dropped the cached dashboard
        let body: Value = server
            .get("/api/v1/reports/dashboard")
            .add_header(AUTHORIZATION, bearer(&token))
            .await
            .json();
        assert_eq!(dec(&body["data"]["balance"]["expense_total"]), Decimal::from(25_000));
        assert_eq!(dec(&body["data"]["balance"]["balance"]), Decimal::from(75_000));
        assert_eq!(dec(&body["data"]["balance"]["expense_percentage"]), Decimal::from(25));
        assert_eq!(body["data"]["recent_transactions"].as_array().unwrap().len(), 2);
        assert_eq!(body["data"]["expense_distribution"][0]["name"], "Alimentación");
    }
}
