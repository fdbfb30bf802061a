use super::Extractor;
use crate::error::ReportError;
use crate::model::{ClientContact, TypeSpecificFields};
use crate::parser::query::Document;

pub struct ClientEmployerRegistration;

impl Extractor for ClientEmployerRegistration {
    fn extract(&self, doc: &Document) -> Result<TypeSpecificFields, ReportError> {
        let t = doc.section("Client/Employer", "Name")?;
        let client = ClientContact {
            name: t.required("Name")?,
            address1: t.required("Address")?,
            address2: t.optional("Address 2"),
            city: t.required("City")?,
            state: t.required("State")?,
            postal_code: t.required("Zip")?,
            phone: t.optional("Phone"),
            email: t.optional("Email"),
        };
        let business = t.optional("Nature of Business");

        let lobbyist = doc.section("Lobbyist", "Name")?.required("Name")?;

        Ok(TypeSpecificFields::ClientEmployerRegistration {
            client,
            lobbyist,
            business,
        })
    }
}
