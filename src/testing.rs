use rocket::figment::Figment;
use rocket::local::asynchronous::Client;

use crate::models::Guest;
use crate::store::Guests;

pub async fn client() -> Client {
    client_with(|figment| figment).await
}

/// A tracked client over the in-memory store, with `configure` applied last.
pub async fn client_with(configure: impl FnOnce(Figment) -> Figment) -> Client {
    let figment = rocket::Config::figment()
        .merge(("storage", "memory"))
        .merge(("log_level", "off"))
        .merge(("base_url", "https://wedding.test"));

    Client::tracked(crate::app(configure(figment)))
        .await
        .expect("valid rocket instance")
}

pub async fn seed(client: &Client, guest: Guest) -> &Guests {
    let guests = client
        .rocket()
        .state::<Guests>()
        .expect("managed guest store");
    guests.create(&guest).await.expect("seed guest");
    guests
}
