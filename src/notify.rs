use lettre::message::header::{self, ContentType};
use lettre::message::Mailboxes;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use rocket::tokio::task;
use tracing::{info, warn};

use crate::config::NotifyConfig;
use crate::models::{Attending, Guest};

type MailResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// E-mails the organizers about a guest's response, off the request path.
pub fn announce(config: Option<&NotifyConfig>, guest: &Guest) {
    let Some(config) = config.cloned() else {
        return;
    };
    let guest = guest.clone();

    task::spawn_blocking(move || match send(&config, &guest) {
        Ok(()) => info!(guest = %guest.id, "response e-mail sent"),
        Err(e) => warn!(guest = %guest.id, "could not send response e-mail: {e}"),
    });
}

fn send(config: &NotifyConfig, guest: &Guest) -> MailResult<()> {
    let mailboxes: Mailboxes = config.to.parse()?;
    let to_header: header::To = mailboxes.into();

    let email = Message::builder()
        .mailbox(to_header)
        .from(config.from.parse()?)
        .subject(subject(guest))
        .header(ContentType::TEXT_PLAIN)
        .body(body(guest))?;

    let creds = Credentials::new(config.username.clone(), config.password.clone());
    let mailer = SmtpTransport::starttls_relay(&config.relay)?
        .credentials(creds)
        .build();

    mailer.send(&email)?;
    Ok(())
}

fn verb(guest: &Guest) -> &'static str {
    match guest.attending {
        Some(Attending::Yes) => "accepted",
        Some(Attending::No) => "declined",
        None => "not answered",
    }
}

fn subject(guest: &Guest) -> String {
    format!("{} has {} your invitation.", guest.full_name, verb(guest))
}

fn body(guest: &Guest) -> String {
    format!(
        "{} has {} your invitation.\nConfirmed headcount: {} of {} reserved seats.\n",
        guest.full_name,
        verb(guest),
        guest.attendance_updated_count,
        guest.attendance_max_count
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_reports_the_answer_and_headcount() {
        let mut guest = Guest::invite("g1".into(), "Ada".into(), "AB12".into(), 3);
        guest.attending = Some(Attending::Yes);
        guest.attendance_updated_count = 2;

        assert_eq!(subject(&guest), "Ada has accepted your invitation.");
        assert!(body(&guest).contains("Confirmed headcount: 2 of 3 reserved seats."));

        guest.attending = Some(Attending::No);
        guest.attendance_updated_count = 0;
        assert_eq!(subject(&guest), "Ada has declined your invitation.");
    }

    #[test]
    fn unconfigured_notifier_is_a_no_op() {
        let guest = Guest::invite("g1".into(), "Ada".into(), "AB12".into(), 1);
        announce(None, &guest);
    }
}
