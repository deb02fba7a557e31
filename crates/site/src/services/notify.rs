//! Booking notifications: admin email, client confirmation, WhatsApp.
//!
//! Email goes over SMTP via lettre with Askama HTML and plain text bodies.
//! WhatsApp messages go to the Cloud API's `/messages` endpoint.

use askama::Template;
use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use opal_core::{BookingId, Email};

use crate::config::{EmailConfig, WhatsAppConfig};

#[derive(Template)]
#[template(path = "email/booking_admin.html")]
struct AdminBookingHtml<'a> {
    notice: &'a BookingNotice,
    admin_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/booking_admin.txt")]
struct AdminBookingText<'a> {
    notice: &'a BookingNotice,
    admin_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/booking_client.html")]
struct ClientConfirmationHtml<'a> {
    name: &'a str,
}

#[derive(Template)]
#[template(path = "email/booking_client.txt")]
struct ClientConfirmationText<'a> {
    name: &'a str,
}

/// Errors that can occur when sending a notification.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The channel has no configuration.
    #[error("{0} notifications are not configured")]
    NotConfigured(&'static str),

    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Messaging API returned an error response.
    #[error("WhatsApp API error: {status} - {message}")]
    Api { status: u16, message: String },
}

/// What a booking notification says.
#[derive(Debug, Clone)]
pub struct BookingNotice {
    pub booking_id: BookingId,
    pub name: String,
    pub email: Email,
    pub phone: Option<String>,
    pub message: String,
}

impl BookingNotice {
    /// Phone number shown in emails.
    #[must_use]
    pub fn phone_display(&self) -> &str {
        self.phone.as_deref().unwrap_or("Not provided")
    }
}

/// Outbound notification channels.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Tell the agency about a new booking.
    async fn send_admin_booking_email(&self, notice: &BookingNotice) -> Result<(), NotifyError>;

    /// Confirm receipt to the client.
    async fn send_client_confirmation(&self, notice: &BookingNotice) -> Result<(), NotifyError>;

    /// Send a WhatsApp text message.
    async fn send_whatsapp(&self, phone: &str, message: &str) -> Result<(), NotifyError>;

    /// Whether a WhatsApp channel is configured at all.
    fn whatsapp_enabled(&self) -> bool;
}

/// Greeting sent to a client over WhatsApp after they get in touch.
#[must_use]
pub fn whatsapp_greeting(name: &str) -> String {
    format!(
        "Hello {name},\n\nThank you for reaching out to Opal Design! We received your inquiry \
         and will get back to you soon.\n\nBest regards,\nOpal Team"
    )
}

// =============================================================================
// Live implementation
// =============================================================================

#[derive(Clone)]
struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
    admin_address: String,
}

#[derive(Clone)]
struct WhatsApp {
    client: reqwest::Client,
    messages_url: String,
    api_token: SecretString,
}

/// SMTP and WhatsApp Cloud API notifier.
#[derive(Clone)]
pub struct LiveNotifier {
    mailer: Option<Mailer>,
    whatsapp: Option<WhatsApp>,
    site_url: String,
}

impl LiveNotifier {
    /// Create a notifier. Missing configuration disables that channel.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be set up or the HTTP client fails to build.
    pub fn new(
        email: Option<&EmailConfig>,
        whatsapp: Option<&WhatsAppConfig>,
        site_url: &str,
    ) -> Result<Self, NotifyError> {
        let mailer = email
            .map(|config| -> Result<Mailer, NotifyError> {
                let credentials = Credentials::new(
                    config.smtp_username.clone(),
                    config.smtp_password.expose_secret().to_string(),
                );
                let transport =
                    AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
                        .port(config.smtp_port)
                        .credentials(credentials)
                        .build();
                Ok(Mailer {
                    transport,
                    from_address: config.from_address.clone(),
                    admin_address: config.admin_address.clone(),
                })
            })
            .transpose()?;

        let whatsapp = whatsapp
            .map(|config| -> Result<WhatsApp, NotifyError> {
                Ok(WhatsApp {
                    client: reqwest::Client::builder()
                        .timeout(std::time::Duration::from_secs(10))
                        .build()?,
                    messages_url: format!("{}/messages", config.api_url.trim_end_matches('/')),
                    api_token: config.api_token.clone(),
                })
            })
            .transpose()?;

        Ok(Self {
            mailer,
            whatsapp,
            site_url: site_url.to_owned(),
        })
    }

    fn mailer(&self) -> Result<&Mailer, NotifyError> {
        self.mailer.as_ref().ok_or(NotifyError::NotConfigured("email"))
    }
}

impl Mailer {
    /// Send a multipart email with both plain text and HTML versions.
    async fn send_multipart_email(
        &self,
        to: &str,
        subject: &str,
        text_body: String,
        html_body: String,
    ) -> Result<(), NotifyError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| NotifyError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| NotifyError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body),
                    ),
            )?;

        self.transport.send(email).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent successfully");
        Ok(())
    }
}

#[async_trait]
impl Notifier for LiveNotifier {
    async fn send_admin_booking_email(&self, notice: &BookingNotice) -> Result<(), NotifyError> {
        let mailer = self.mailer()?;
        let admin_url = format!("{}/admin/bookings/{}", self.site_url, notice.booking_id);

        let html = AdminBookingHtml {
            notice,
            admin_url: &admin_url,
        }
        .render()?;
        let text = AdminBookingText {
            notice,
            admin_url: &admin_url,
        }
        .render()?;

        mailer
            .send_multipart_email(
                &mailer.admin_address,
                &format!("New Booking Request from {}", notice.name),
                text,
                html,
            )
            .await
    }

    async fn send_client_confirmation(&self, notice: &BookingNotice) -> Result<(), NotifyError> {
        let mailer = self.mailer()?;
        let html = ClientConfirmationHtml { name: &notice.name }.render()?;
        let text = ClientConfirmationText { name: &notice.name }.render()?;

        mailer
            .send_multipart_email(
                notice.email.as_str(),
                "We received your inquiry - Opal Design",
                text,
                html,
            )
            .await
    }

    async fn send_whatsapp(&self, phone: &str, message: &str) -> Result<(), NotifyError> {
        let whatsapp = self
            .whatsapp
            .as_ref()
            .ok_or(NotifyError::NotConfigured("WhatsApp"))?;

        let body = serde_json::json!({
            "messaging_product": "whatsapp",
            "recipient_type": "individual",
            "to": phone,
            "type": "text",
            "text": {
                "preview_url": true,
                "body": message,
            },
        });

        let response = whatsapp
            .client
            .post(&whatsapp.messages_url)
            .bearer_auth(whatsapp.api_token.expose_secret())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(NotifyError::Api {
                status: status.as_u16(),
                message,
            });
        }

        tracing::info!("WhatsApp message sent");
        Ok(())
    }

    fn whatsapp_enabled(&self) -> bool {
        self.whatsapp.is_some()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn notice() -> BookingNotice {
        BookingNotice {
            booking_id: BookingId::generate(),
            name: "Grace <Hopper>".to_string(),
            email: Email::parse("grace@navy.mil").unwrap(),
            phone: None,
            message: "Line one\nLine two".to_string(),
        }
    }

    #[test]
    fn test_whatsapp_greeting_mentions_name() {
        let greeting = whatsapp_greeting("Ada");
        assert!(greeting.starts_with("Hello Ada,"));
        assert!(greeting.ends_with("Opal Team"));
    }

    #[test]
    fn test_admin_email_escapes_and_links() {
        let notice = notice();
        let html = AdminBookingHtml {
            notice: &notice,
            admin_url: "https://opal.studio/admin/bookings/1",
        }
        .render()
        .unwrap();

        assert!(html.contains("Grace &#60;Hopper&#62;") || html.contains("Grace &lt;Hopper&gt;"));
        assert!(html.contains("Not provided"));
        assert!(html.contains("https://opal.studio/admin/bookings/1"));
    }

    #[tokio::test]
    async fn test_unconfigured_channels() {
        let notifier = LiveNotifier::new(None, None, "https://opal.studio").unwrap();
        assert!(!notifier.whatsapp_enabled());
        assert!(matches!(
            notifier.send_admin_booking_email(&notice()).await,
            Err(NotifyError::NotConfigured("email"))
        ));
        assert!(matches!(
            notifier.send_whatsapp("+15550100", "hi").await,
            Err(NotifyError::NotConfigured("WhatsApp"))
        ));
    }
}
