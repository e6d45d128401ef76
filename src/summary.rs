use rocket::form::Form;
use rocket::http::{ContentType, Header, RawStr, Status};
use rocket::request::FlashMessage;
use rocket::response::stream::{Event, EventStream};
use rocket::response::{Flash, Redirect};
use rocket::tokio::select;
use rocket::tokio::sync::broadcast::error::RecvError;
use rocket::{Route, Shutdown, State};
use rocket_dyn_templates::{context, Template};
use tracing::info;

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::export;
use crate::links::{guest_path, ShareLinks};
use crate::listing::{self, Order, SortKey};
use crate::models::{Guest, GuestPatch, ID_MAX_LEN, NAME_MAX_LEN, TOKEN_MAX_LEN};
use crate::store::{Guests, DUPLICATE_ID};
use crate::token;

#[derive(FromForm)]
pub struct NewGuest {
    #[field(default = String::new())]
    full_name: String,
    #[field(default = String::new())]
    id: String,
    #[field(default = String::new())]
    token: String,
    #[field(default = String::new())]
    max_count: String,
}

#[derive(FromForm)]
pub struct GuestEdit {
    #[field(default = String::new())]
    full_name: String,
    #[field(default = String::new())]
    token: String,
    #[field(default = String::new())]
    max_count: String,
}

#[derive(Responder)]
pub struct Spreadsheet {
    body: Vec<u8>,
    content_type: ContentType,
    disposition: Header<'static>,
}

fn flash_context(flash: Option<FlashMessage<'_>>) -> Option<(String, String)> {
    flash.map(|f| (f.kind().to_string(), f.message().to_string()))
}

fn max_count(raw: &str) -> Result<i32> {
    raw.trim()
        .parse::<i32>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| Error::validation("Max count must be a positive number."))
}

fn within(field: &str, value: &str, limit: usize) -> Result<()> {
    if value.chars().count() > limit {
        return Err(Error::validation(format!(
            "{field} cannot be longer than {limit} characters."
        )));
    }
    Ok(())
}

fn check_details(full_name: &str, token: &str) -> Result<()> {
    within("Full name", full_name, NAME_MAX_LEN)?;
    within("Token", token, TOKEN_MAX_LEN)
}

#[get("/")]
pub fn index() -> Redirect {
    Redirect::to(uri!("/summary"))
}

#[get("/summary?<q>&<sort>&<order>")]
pub async fn list(
    q: Option<&str>,
    sort: Option<SortKey>,
    order: Option<Order>,
    flash: Option<FlashMessage<'_>>,
    guests: &State<Guests>,
    settings: &State<Settings>,
    links: ShareLinks,
) -> (Status, Template) {
    let order = order.unwrap_or_default();
    let next_order = match order {
        Order::Asc => Order::Desc,
        Order::Desc => Order::Asc,
    };
    let (status, loaded, error) = match guests.all().await {
        Ok(loaded) => (Status::Ok, loaded, None),
        Err(e) => (e.status(), Vec::new(), Some(e.public_message())),
    };
    let listing = listing::build(loaded, q, sort, order, &links);

    let page = Template::render(
        "summary",
        context! {
            listing,
            q: q.unwrap_or_default(),
            q_param: RawStr::new(q.unwrap_or_default()).percent_encode().to_string(),
            sort,
            next_order,
            error,
            flash: flash_context(flash),
            new_token: token::generate(settings.token_length),
            cutoff: settings.cutoff_label(),
        },
    );
    (status, page)
}

async fn add(form: &NewGuest, guests: &Guests) -> Result<Guest> {
    let full_name = form.full_name.trim();
    let id = form.id.trim();
    let token = form.token.trim();

    if full_name.is_empty() || id.is_empty() || token.is_empty() {
        return Err(Error::validation(
            "Please fill all fields and generate a token.",
        ));
    }
    if id.contains('/') {
        return Err(Error::validation("Unique ID cannot contain '/'."));
    }
    within("Unique ID", id, ID_MAX_LEN)?;
    check_details(full_name, token)?;
    let max = max_count(&form.max_count)?;

    let loaded = guests.all().await?;
    if loaded.iter().any(|guest| guest.id == id) {
        return Err(Error::validation(DUPLICATE_ID));
    }

    let guest = Guest::invite(id.to_string(), full_name.to_string(), token.to_string(), max);
    guests.create(&guest).await?;
    Ok(guest)
}

#[post("/summary/guests", data = "<form>")]
pub async fn create(form: Form<NewGuest>, guests: &State<Guests>) -> Flash<Redirect> {
    match add(&form, guests).await {
        Ok(guest) => {
            info!(guest = %guest.id, "invitee added");
            Flash::success(Redirect::to(uri!("/summary")), "Invitee added!")
        }
        Err(e) => Flash::error(Redirect::to(uri!("/summary")), e.public_message()),
    }
}

#[get("/summary/guests/<id>/edit")]
pub async fn edit_form(
    id: &str,
    flash: Option<FlashMessage<'_>>,
    guests: &State<Guests>,
) -> Result<Template> {
    let guest = guests.get(id).await?;
    Ok(Template::render(
        "edit",
        context! { path: guest_path(&guest.id), guest, flash: flash_context(flash) },
    ))
}

async fn revise(id: &str, form: &GuestEdit, guests: &Guests) -> Result<()> {
    let full_name = form.full_name.trim();
    let token = form.token.trim();
    if full_name.is_empty() || token.is_empty() {
        return Err(Error::validation("Name and token are required."));
    }
    check_details(full_name, token)?;
    let max = max_count(&form.max_count)?;

    let guest = guests.get(id).await?;
    if max < guest.attendance_updated_count {
        return Err(Error::validation(format!(
            "Max count cannot be below the confirmed headcount ({}).",
            guest.attendance_updated_count
        )));
    }

    let patch = GuestPatch::details(full_name.to_string(), token.to_string(), max);
    guests.update(id, &patch).await
}

#[post("/summary/guests/<id>", data = "<form>")]
pub async fn edit(id: &str, form: Form<GuestEdit>, guests: &State<Guests>) -> Flash<Redirect> {
    match revise(id, &form, guests).await {
        Ok(()) => {
            info!(guest = %id, "invitee updated");
            Flash::success(Redirect::to(uri!("/summary")), "Updated successfully")
        }
        Err(Error::NotFound) => {
            Flash::error(Redirect::to(uri!("/summary")), Error::NotFound.public_message())
        }
        Err(e) => Flash::error(Redirect::to(uri!(edit_form(id))), e.public_message()),
    }
}

#[get("/summary/guests/<id>/delete")]
pub async fn confirm_delete(id: &str, guests: &State<Guests>) -> Result<Template> {
    let guest = guests.get(id).await?;
    Ok(Template::render(
        "delete",
        context! { path: guest_path(&guest.id), guest },
    ))
}

#[delete("/summary/guests/<id>")]
pub async fn remove(id: &str, guests: &State<Guests>) -> Flash<Redirect> {
    match guests.delete(id).await {
        Ok(()) => {
            info!(guest = %id, "invitee deleted");
            Flash::success(Redirect::to(uri!("/summary")), "Deleted successfully")
        }
        Err(e) => Flash::error(Redirect::to(uri!("/summary")), e.public_message()),
    }
}

#[get("/summary/export")]
pub async fn download(guests: &State<Guests>, links: ShareLinks) -> Result<Spreadsheet> {
    let listing = listing::build(guests.all().await?, None, None, Order::Asc, &links);
    let body = export::workbook(&listing.rows)?;

    Ok(Spreadsheet {
        body,
        content_type: ContentType::new(
            "application",
            "vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        ),
        disposition: Header::new(
            "Content-Disposition",
            format!("attachment; filename=\"{}\"", export::FILE_NAME),
        ),
    })
}

/// Streams committed writes so open summary pages can refresh.
#[get("/summary/events")]
pub fn events(guests: &State<Guests>, mut end: Shutdown) -> EventStream![] {
    let mut changes = guests.subscribe();
    EventStream! {
        loop {
            let change = select! {
                msg = changes.recv() => match msg {
                    Ok(change) => change,
                    Err(RecvError::Closed) => break,
                    Err(RecvError::Lagged(_)) => continue,
                },
                _ = &mut end => break,
            };

            yield Event::json(&change);
        }
    }
}

pub fn routes() -> Vec<Route> {
    routes![
        index,
        list,
        create,
        edit_form,
        edit,
        confirm_delete,
        remove,
        download,
        events
    ]
}
