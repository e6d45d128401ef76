use rocket::http::Status;
use rocket::request::Request;
use rocket::response::{self, Responder};
use rocket_dyn_templates::{context, Template};
use thiserror::Error;
use tracing::error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Guest not found.")]
    NotFound,

    #[error("Invalid token. Access denied.")]
    Unauthorized,

    #[error("{0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Spreadsheet error: {0}")]
    Export(#[from] rust_xlsxwriter::XlsxError),
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    pub fn status(&self) -> Status {
        match self {
            Error::NotFound => Status::NotFound,
            Error::Unauthorized => Status::Forbidden,
            Error::Validation(_) => Status::UnprocessableEntity,
            Error::Database(_) | Error::Pool(_) | Error::Export(_) => Status::InternalServerError,
        }
    }

    /// The text shown to the user. Storage failures are logged, not displayed.
    pub fn public_message(&self) -> String {
        match self {
            Error::Database(_) | Error::Pool(_) => {
                error!("persistence failure: {self}");
                "Something went wrong while talking to the guest list. Please try again.".to_string()
            }
            Error::Export(_) => {
                error!("export failure: {self}");
                "The spreadsheet could not be generated.".to_string()
            }
            _ => self.to_string(),
        }
    }
}

impl<'r> Responder<'r, 'static> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        let status = self.status();
        let message = self.public_message();
        (status, Template::render("error", context! { message })).respond_to(req)
    }
}
