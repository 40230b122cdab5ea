use std::sync::Arc;
use std::time::Duration;

use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::Serialize;
use tracing::{debug, error, info};

use crate::config::{Config, Push, Smtp};
use crate::error::AppError;
use crate::result::Result;
use crate::session::{Session, SessionContext};

/// Announces a new session: e-mail right away, push after a delay and only
/// if the stream is still running by then (short-lived streams stay quiet).
/// Everything here is fire-and-forget; failures are logged and dropped.
pub fn session_started(ctx: &SessionContext, session: &Arc<Session>) {
    let subject = format!("{} just started a stream!", session.title);
    let body = format!("{}<br>{}", session.description, session.source_url);
    spawn_email(ctx.config.smtp.clone(), subject.clone(), body);

    if session.title.to_lowercase().contains("test") {
        return;
    }

    let push_cfg = ctx.config.push.clone();
    let delay = Duration::from_secs(60 * ctx.config.recorder.notification_delay.0);
    let client = ctx.client.clone();
    let session = session.clone();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        if !session.is_recording() || session.recording_stopped() {
            debug!(host = %session.host, "stream already over, skipping push");
            return;
        }
        for topic in [&push_cfg.android_topic, &push_cfg.web_topic] {
            if let Err(e) = send_push(
                &client,
                &push_cfg,
                topic,
                &subject,
                &session.description,
                &session.source_url,
            )
            .await
            {
                error!(host = %session.host, "push to {topic} failed: {:?}", e);
            }
        }
        info!(host = %session.host, "notification sent");
    });
}

pub fn daemon_started(config: &Config) {
    spawn_email(
        config.smtp.clone(),
        "Stream recorder started successfully".to_string(),
        format!("http://{}", config.http.listen),
    );
}

fn spawn_email(cfg: Smtp, subject: String, body: String) {
    tokio::spawn(async move {
        if let Err(e) = send_email(cfg, &subject, body).await {
            error!("e-mail '{subject}' failed: {:?}", e);
        }
    });
}

async fn send_email(cfg: Smtp, subject: &str, body: String) -> Result<()> {
    if cfg.server.is_empty() {
        debug!("no SMTP server configured, dropping '{subject}'");
        return Ok(());
    }

    let message = Message::builder()
        .from(cfg.from.parse()?)
        .to(cfg.to.parse()?)
        .subject(subject)
        .header(ContentType::TEXT_HTML)
        .body(body)?;

    let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.server)?
        .port(cfg.port)
        .credentials(Credentials::new(cfg.username, cfg.password))
        .build();
    mailer.send(message).await?;
    Ok(())
}

#[derive(Serialize)]
struct PushMessage<'a> {
    topic: &'a str,
    title: &'a str,
    body: &'a str,
    link: &'a str,
}

async fn send_push(
    client: &reqwest::Client,
    cfg: &Push,
    topic: &str,
    title: &str,
    body: &str,
    link: &str,
) -> Result<()> {
    if cfg.url.is_empty() {
        debug!("no push relay configured, dropping '{title}'");
        return Ok(());
    }

    let response = client
        .post(&cfg.url)
        .bearer_auth(&cfg.token)
        .json(&PushMessage {
            topic,
            title,
            body,
            link,
        })
        .send()
        .await
        .map_err(AppError::transfer_failed)?;
    if !response.status().is_success() {
        return Err(AppError::transfer_failed(format!(
            "push relay answered {}",
            response.status()
        )));
    }
    Ok(())
}
