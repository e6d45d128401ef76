use rocket::form::Form;
use rocket::http::Status;
use rocket::{Route, State};
use rocket_dyn_templates::{context, Template};
use tracing::{info, warn};

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::links::rsvp_path;
use crate::models::{Attending, Guest, GuestPatch};
use crate::notify;
use crate::store::Guests;

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromFormField)]
pub enum Mode {
    View,
    Rsvp,
}

#[derive(Debug, FromForm)]
pub struct RsvpForm {
    choice: Option<String>,
    count: Option<String>,
}

/// A validated guest response, ready to be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reply {
    pub attending: Attending,
    pub count: i32,
}

impl Reply {
    pub fn patch(&self) -> GuestPatch {
        GuestPatch::response(self.attending, self.count)
    }

    fn notice(&self) -> String {
        match self.attending {
            Attending::Yes => format!(
                "Your attendance has been confirmed for {} people.",
                self.count
            ),
            Attending::No => "You have confirmed that you will not attend.".to_string(),
        }
    }
}

/// Checks a submitted choice and headcount against the guest's reserved seats.
pub fn decide(max_count: i32, choice: Option<&str>, count: Option<&str>) -> Result<Reply> {
    match choice {
        Some("no") => Ok(Reply {
            attending: Attending::No,
            count: 0,
        }),
        Some("yes") if max_count == 1 => Ok(Reply {
            attending: Attending::Yes,
            count: 1,
        }),
        Some("yes") => {
            let invalid = || {
                Error::validation(format!(
                    "You have {max_count} seats available. Please enter a number of \
                     participants less than or equal to {max_count}."
                ))
            };
            let requested: i64 = count
                .map(str::trim)
                .unwrap_or_default()
                .parse()
                .map_err(|_| invalid())?;

            if requested <= 0 {
                return Err(invalid());
            }
            if requested > i64::from(max_count) {
                return Err(Error::validation(format!(
                    "You cannot exceed your reserved seats ({max_count})."
                )));
            }
            Ok(Reply {
                attending: Attending::Yes,
                count: requested as i32,
            })
        }
        _ => Err(Error::validation(
            "Please select Yes or No before confirming your RSVP.",
        )),
    }
}

/// Fetches the guest and checks the link token. Nothing about the guest leaks on failure.
pub async fn admit(guests: &Guests, id: &str, token: Option<&str>) -> Result<Guest> {
    let guest = guests.get(id).await?;
    if token != Some(guest.token.as_str()) {
        warn!(guest = %id, "RSVP link used with a wrong token");
        return Err(Error::Unauthorized);
    }
    Ok(guest)
}

#[derive(Default)]
struct Screen {
    editing: bool,
    error: Option<String>,
    notice: Option<String>,
    choice: Option<String>,
    count: Option<String>,
}

fn render(guest: &Guest, settings: &Settings, screen: Screen) -> Template {
    let expired = settings.cutoff_reached();
    let choice = screen
        .choice
        .or_else(|| guest.attending.map(|a| a.as_str().to_string()));
    let count = screen.count.unwrap_or_else(|| {
        guest.attendance_updated_count.max(1).to_string()
    });

    Template::render(
        "rsvp",
        context! {
            guest,
            action: rsvp_path(&guest.id, &guest.token),
            editing: screen.editing || !guest.has_responded(),
            ask_count: guest.attendance_max_count > 1,
            expired,
            cutoff: settings.cutoff_label(),
            error: screen.error,
            notice: screen.notice,
            choice,
            count,
        },
    )
}

#[get("/rsvp/<id>?<token>&<mode>")]
pub async fn show(
    id: &str,
    token: Option<&str>,
    mode: Option<Mode>,
    guests: &State<Guests>,
    settings: &State<Settings>,
) -> Result<Template> {
    let guest = admit(guests, id, token).await?;
    let editing = mode == Some(Mode::Rsvp) && !settings.cutoff_reached();

    Ok(render(
        &guest,
        settings,
        Screen {
            editing,
            ..Default::default()
        },
    ))
}

#[post("/rsvp/<id>?<token>", data = "<form>")]
pub async fn submit(
    id: &str,
    token: Option<&str>,
    form: Form<RsvpForm>,
    guests: &State<Guests>,
    settings: &State<Settings>,
) -> Result<(Status, Template)> {
    let mut guest = admit(guests, id, token).await?;
    let form = form.into_inner();

    let written = match decide(
        guest.attendance_max_count,
        form.choice.as_deref(),
        form.count.as_deref(),
    ) {
        Ok(reply) => guests
            .update(&guest.id, &reply.patch())
            .await
            .map(|()| reply),
        Err(e) => Err(e),
    };

    let reply = match written {
        Ok(reply) => reply,
        Err(e) => {
            let screen = Screen {
                editing: true,
                error: Some(e.public_message()),
                choice: form.choice,
                count: form.count,
                ..Default::default()
            };
            return Ok((e.status(), render(&guest, settings, screen)));
        }
    };

    reply.patch().apply(&mut guest);
    info!(
        guest = %guest.id,
        attending = reply.attending.as_str(),
        count = reply.count,
        "RSVP recorded"
    );
    notify::announce(settings.notify.as_ref(), &guest);

    let screen = Screen {
        notice: Some(reply.notice()),
        ..Default::default()
    };
    Ok((Status::Ok, render(&guest, settings, screen)))
}

pub fn routes() -> Vec<Route> {
    routes![show, submit]
}
