use std::convert::Infallible;

use rocket::http::RawStr;
use rocket::request::{FromRequest, Outcome, Request};

use crate::config::Settings;
use crate::models::Guest;

/// Relative RSVP link for a guest, percent-encoded.
pub fn rsvp_path(id: &str, token: &str) -> String {
    format!(
        "/rsvp/{}?token={}",
        RawStr::new(id).percent_encode(),
        RawStr::new(token).percent_encode()
    )
}

/// Organizer path for one guest record, percent-encoded.
pub fn guest_path(id: &str) -> String {
    format!("/summary/guests/{}", RawStr::new(id).percent_encode())
}

/// Origin that shareable RSVP links are built on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareLinks {
    base: String,
}

impl ShareLinks {
    pub fn new(base: impl Into<String>) -> Self {
        let base = base.into();
        ShareLinks {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    pub fn rsvp_url(&self, guest: &Guest) -> String {
        format!("{}{}", self.base, rsvp_path(&guest.id, &guest.token))
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for ShareLinks {
    type Error = Infallible;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let configured = req
            .rocket()
            .state::<Settings>()
            .and_then(|settings| settings.base_url.clone());

        let base = configured.unwrap_or_else(|| match req.host() {
            Some(host) => format!("http://{host}"),
            None => format!("http://localhost:{}", req.rocket().config().port),
        });
        Outcome::Success(ShareLinks::new(base))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_carry_id_and_token() {
        let links = ShareLinks::new("https://wedding.test/");
        let guest = Guest::invite("g1".into(), "Ada".into(), "AB12".into(), 2);
        assert_eq!(links.rsvp_url(&guest), "https://wedding.test/rsvp/g1?token=AB12");
    }

    #[test]
    fn unsafe_characters_are_encoded() {
        assert_eq!(rsvp_path("the smiths", "AB12"), "/rsvp/the%20smiths?token=AB12");
    }
}
