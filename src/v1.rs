//! Typed endpoints of the storefront API.

use reqwest::Method;

use crate::errors::StorefrontError;
use crate::structs::catalog::{Country, Device, Region};
use crate::structs::client::{Client, Query, QueryState};
use crate::structs::order::Order;
use crate::structs::ticket::{NewMessage, NewTicket, SendBlock, Ticket, TicketMessage};
use crate::structs::user::{Profile, UserCookieData};
use crate::structs::{GeneralSettings, Page, Paginated};
use crate::transport::FormPayload;

impl Client {
    pub async fn general_settings(&self) -> Result<Query<GeneralSettings>, StorefrontError> {
        self.fetch_public("/generalSettings").await
    }

    pub async fn countries(&self) -> Result<Query<Vec<Country>>, StorefrontError> {
        self.fetch_public("/country").await
    }

    pub async fn regions(&self) -> Result<Query<Vec<Region>>, StorefrontError> {
        self.fetch_public("/regions").await
    }

    pub async fn compatible_devices(&self) -> Result<Query<Vec<Device>>, StorefrontError> {
        self.fetch_public("/deviceCompatible").await
    }

    pub async fn pages(&self) -> Result<Query<Vec<Page>>, StorefrontError> {
        self.fetch_public("/pages").await
    }

    pub async fn page(&self, slug: &str) -> Result<Query<Page>, StorefrontError> {
        self.fetch_public(&format!("/pages/{}", urlencoding::encode(slug))).await
    }

    /// Current user's profile. Also refreshes the `user_data` cookie.
    pub async fn profile(&self) -> Result<QueryState<Profile>, StorefrontError> {
        let state = self.fetch_protected::<Profile>("/profile").await?;
        if let Some(profile) = state.data() {
            if let Err(err) = self.cookies().set_user(&UserCookieData::from(profile)) {
                tracing::warn!(error = %err, "could not refresh user_data cookie");
            }
        }
        Ok(state)
    }

    pub async fn orders(&self, page: u32) -> Result<QueryState<Paginated<Order>>, StorefrontError> {
        self.fetch_protected(&format!("/orders?page={}", page.max(1))).await
    }

    pub async fn order(&self, id: u64) -> Result<QueryState<Order>, StorefrontError> {
        self.fetch_protected(&format!("/orders/{}", id)).await
    }

    pub async fn tickets(&self, page: u32) -> Result<QueryState<Paginated<Ticket>>, StorefrontError> {
        self.fetch_protected(&format!("/tickets?page={}", page.max(1))).await
    }

    pub async fn ticket(&self, id: u64) -> Result<QueryState<Ticket>, StorefrontError> {
        self.fetch_protected(&format!("/tickets/{}", id)).await
    }

    pub async fn create_ticket(&self, ticket: &NewTicket) -> Result<Ticket, StorefrontError> {
        if ticket.subject.trim().is_empty() || ticket.message.trim().is_empty() {
            return Err(StorefrontError::InvalidInput(
                "a ticket needs a subject and a message".to_string(),
            ));
        }
        self.mutation("/tickets").json(ticket)?.send().await
    }

    /// Appends a user message to `ticket`.
    ///
    /// Refused locally when the ticket is closed or still waiting on an admin
    /// reply; the backend applies the same rule.
    pub async fn send_ticket_message(&self, ticket: &Ticket, message: NewMessage) -> Result<TicketMessage, StorefrontError> {
        match ticket.send_block() {
            Some(SendBlock::Closed) => {
                return Err(StorefrontError::InvalidInput(format!("ticket {} is closed", ticket.id)))
            }
            Some(SendBlock::AwaitingAdminReply) => {
                return Err(StorefrontError::InvalidInput(format!(
                    "ticket {} is waiting for a support reply",
                    ticket.id
                )))
            }
            None => {}
        }
        if message.message.trim().is_empty() && message.attachment.is_none() {
            return Err(StorefrontError::InvalidInput("message is empty".to_string()));
        }

        let path = format!("/tickets/{}/messages", ticket.id);
        let mutation = self.mutation(&path).method(Method::POST);

        match message.attachment {
            Some(file) => {
                let form = FormPayload::new()
                    .text("message", message.message)
                    .file("attachment", &file.file_name, &file.mime, file.bytes);
                mutation.form(form).send().await
            }
            None => {
                mutation
                    .json(&serde_json::json!({ "message": message.message }))?
                    .send()
                    .await
            }
        }
    }
}
