use std::time::Duration;

use anyhow::Context;

use futures_util::future::join_all;

use reqwest::Client;

use serde::Serialize;

use secrecy::Secret;

use url::Url;

use crate::domain::EmailAddress;

/// Transactional email provider client
#[derive(Debug)]
pub struct EmailClient {
    client: Client,
    sender: EmailAddress,

    api_send_email_url: Url,
    api_auth_token: Secret<String>,
}

impl EmailClient {
    pub fn new(
        sender: EmailAddress,
        api_timeout: Duration,
        api_base_url: Url,
        api_auth_token: Secret<String>,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(api_timeout)
            .build()
            .context("Failed to build http client")?;

        let api_send_email_url = api_base_url
            .join("emails")
            .context("Failed to create send email endpoint URL")?;

        Ok(Self {
            client,
            sender,
            api_send_email_url,
            api_auth_token,
        })
    }

    #[tracing::instrument(name = "Send an email via API", skip(self, email), fields(recipient = %email.recipient))]
    pub async fn send(&self, email: &Email) -> reqwest::Result<()> {
        use secrecy::ExposeSecret;

        self.client
            .post(self.api_send_email_url.clone())
            .bearer_auth(self.api_auth_token.expose_secret())
            .json(&email.as_request(&self.sender))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// Send every email of a batch, reporting the outcome of each one in order
    #[tracing::instrument(name = "Send an email batch via API", skip(self, emails), fields(size = emails.len()))]
    pub async fn send_batch(&self, emails: &[Email]) -> Vec<reqwest::Result<()>> {
        join_all(emails.iter().map(|email| self.send(email))).await
    }
}

/// A single templated message to one recipient
#[derive(Debug, Clone)]
pub struct Email {
    pub recipient: EmailAddress,
    pub subject: String,
    pub html_body: String,
    pub text_body: Option<String>,
}

impl Email {
    fn as_request<'e>(&'e self, sender: &'e EmailAddress) -> SendEmailRequest<'e> {
        SendEmailRequest {
            from: sender.as_ref(),
            to: [self.recipient.as_ref()],
            subject: &self.subject,
            html: &self.html_body,
            text: self.text_body.as_deref(),
        }
    }
}

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
}

#[cfg(test)]
mod tests {
    use claims::{assert_err, assert_ok};

    use fake::faker::internet::en::SafeEmail;
    use fake::faker::lorem::en::{Paragraph, Sentence};
    use fake::{Fake, Faker};

    use wiremock::matchers::*;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    struct SendEmailBodyMatcher;

    impl wiremock::Match for SendEmailBodyMatcher {
        fn matches(&self, req: &wiremock::Request) -> bool {
            let result: Result<serde_json::Value, _> = serde_json::from_slice(&req.body);
            if let Ok(body) = result {
                body.get("from").is_some()
                    && body.get("to").map_or(false, |to| to.is_array())
                    && body.get("subject").is_some()
                    && body.get("html").is_some()
            } else {
                false
            }
        }
    }

    #[tokio::test]
    async fn send_posts_to_api() {
        let mock_server = MockServer::start().await;
        let client = email_client(&mock_server.uri());

        Mock::given(header_exists("Authorization"))
            .and(header("Content-Type", "application/json"))
            .and(path("/emails"))
            .and(method("POST"))
            .and(SendEmailBodyMatcher)
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        assert_ok!(client.send(&fake_message()).await);
    }

    #[tokio::test]
    async fn send_fails_if_api_returns_500() {
        let mock_server = MockServer::start().await;
        let client = email_client(&mock_server.uri());

        Mock::given(any())
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&mock_server)
            .await;

        assert_err!(client.send(&fake_message()).await);
    }

    #[tokio::test]
    async fn send_fails_if_api_takes_too_long() {
        let mock_server = MockServer::start().await;
        let client = email_client(&mock_server.uri());

        Mock::given(any())
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(180)))
            .expect(1)
            .mount(&mock_server)
            .await;

        assert_err!(client.send(&fake_message()).await);
    }

    #[tokio::test]
    async fn send_batch_reports_each_recipient() {
        let mock_server = MockServer::start().await;
        let client = email_client(&mock_server.uri());

        let rejected = fake_message();
        Mock::given(body_string_contains(rejected.recipient.as_ref()))
            .respond_with(ResponseTemplate::new(422))
            .mount(&mock_server)
            .await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .mount(&mock_server)
            .await;

        let batch = vec![fake_message(), rejected, fake_message()];
        let results = client.send_batch(&batch).await;

        assert_eq!(3, results.len());
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        assert!(results[2].is_ok());
    }

    fn fake_email() -> EmailAddress {
        SafeEmail().fake::<String>().parse().unwrap()
    }

    fn fake_message() -> Email {
        Email {
            recipient: fake_email(),
            subject: Sentence(1..2).fake(),
            html_body: Paragraph(1..2).fake(),
            text_body: Some(Paragraph(1..2).fake()),
        }
    }

    fn email_client(server_uri: &str) -> EmailClient {
        let sender = fake_email();
        let mock_api_timeout = Duration::from_secs(2);
        let mock_api_url = Url::parse(server_uri).unwrap();
        let mock_api_auth = Secret::new(Faker.fake::<String>());

        EmailClient::new(sender, mock_api_timeout, mock_api_url, mock_api_auth).unwrap()
    }
}
