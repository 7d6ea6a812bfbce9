use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use chrono::FixedOffset;

use reqwest::{Client, Method, Response};

use secrecy::Secret;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use sqlx::PgPool;

use url::Url;

use uuid::Uuid;

use wiremock::MockServer;

use cafe::app::{self, AppData};
use cafe::auth::compute_password_hash;
use cafe::client::EmailClient;
use cafe::controller::cron::CronSecret;
use cafe::controller::inquiries::NotifyAddress;
use cafe::crypto::SigningKey;
use cafe::domain::{DeviceParser, Role};
use cafe::model::NewUser;
use cafe::repo::UsersRepo;
use cafe::settings::{NewsletterSettings, SessionSettings};

pub const CRON_SECRET: &str = "test-cron-secret";

pub struct TestApp {
    addr: String,

    pub client: Client,
    pub email_server: MockServer,
}

impl TestApp {
    pub async fn spawn(pool: &PgPool) -> Self {
        use rand::{distributions::Alphanumeric, Rng};

        let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to listen on random port");
        let port = listener.local_addr().unwrap().port();

        let addr = format!("http://127.0.0.1:{}", port);

        let signing_key = {
            let rand_key: String = rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(32)
                .map(char::from)
                .collect();

            SigningKey::new(&Secret::new(rand_key)).expect("Failed to create crypto signing key")
        };

        let email_server = MockServer::start().await;

        let email_client = {
            let sender = "test@test.com"
                .parse()
                .expect("Failed to parse sender email address");
            let api_base_url =
                Url::parse(&email_server.uri()).expect("Failed to parse mock server uri");
            let api_auth_token = Secret::new("TestAuthorization".into());
            let api_timeout = Duration::from_secs(2);

            EmailClient::new(sender, api_timeout, api_base_url, api_auth_token)
                .expect("Failed to create email client")
        };

        let data = AppData {
            signing_key,
            email_client: Arc::new(email_client),
            session: SessionSettings::default(),
            newsletter: NewsletterSettings {
                batch_delay_milliseconds: 0,
                ..NewsletterSettings::default()
            },
            device_parser: DeviceParser::keywords_only(),
            utc_offset: FixedOffset::east_opt(0).unwrap(),
            cron_secret: CronSecret::new(&Secret::new(CRON_SECRET.into()))
                .expect("Failed to build cron secret"),
            notify_address: NotifyAddress(None),
        };

        let server =
            app::run(listener, pool.clone(), data).expect("Failed to spawn app instance");
        let _ = tokio::spawn(server);

        let client = Client::builder()
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("Failed to build http client");

        Self {
            addr,
            client,
            email_server,
        }
    }

    pub fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}", &self.addr, url);
        self.client.request(method, url)
    }

    pub async fn get(&self, url: &str) -> Response {
        self.request(Method::GET, url)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn send_json(&self, method: Method, url: &str, body: &Value) -> Response {
        self.request(method, url)
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn post_json(&self, url: &str, body: &Value) -> Response {
        self.send_json(Method::POST, url, body).await
    }

    pub async fn health_check(&self) -> reqwest::Result<Response> {
        self.request(Method::GET, "health_check").send().await
    }

    pub async fn login(&self, user: &TestUser) -> Response {
        self.post_json(
            "api/auth/login",
            &json!({ "email": user.email, "password": user.password }),
        )
        .await
    }

    /// Log in as a fresh user with `role`, keeping the session cookie
    pub async fn login_as(&self, pool: &PgPool, role: Role) -> TestUser {
        let user = TestUser::register(pool, role).await;
        let res = self.login(&user).await;
        assert_eq!(200, res.status().as_u16(), "Login failed");
        user
    }

    /// Create a product through the admin API; needs an admin session
    pub async fn create_product(&self, title: &str, price: f64, stock: i32) -> Uuid {
        let res = self
            .post_json(
                "api/admin/products",
                &json!({ "title": title, "price": price, "stock": stock }),
            )
            .await;
        assert_eq!(201, res.status().as_u16(), "Failed to create product");

        let body: Value = res.json().await.unwrap();
        body["data"]["id"].as_str().unwrap().parse().unwrap()
    }

    pub async fn create_coupon(&self, body: &Value) {
        let res = self.post_json("api/admin/coupons", body).await;
        assert_eq!(201, res.status().as_u16(), "Failed to create coupon");
    }
}

/// Unwrap the `data` of a success envelope
pub async fn data<T: DeserializeOwned>(res: Response) -> T {
    let body: Value = res.json().await.expect("Response was not JSON");
    assert_eq!(Some(true), body["success"].as_bool(), "Not a success: {}", body);
    serde_json::from_value(body["data"].clone()).expect("Unexpected data shape")
}

#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub password: String,
}

impl TestUser {
    pub async fn register(pool: &PgPool, role: Role) -> Self {
        let email = format!("{}@cafe.test", Uuid::new_v4().simple());
        let password = Uuid::new_v4().to_string();

        let new_user = NewUser {
            email: email.parse().expect("Failed to parse email address"),
            password_hash: compute_password_hash(&Secret::new(password.clone()))
                .expect("Failed to hash user password"),
            role,
        };

        let id = UsersRepo::insert(pool, &new_user)
            .await
            .expect("Failed to insert test user");

        Self {
            id,
            email,
            password,
        }
    }
}
