use super::Extractor;
use crate::error::ReportError;
use crate::model::{Filer, TypeSpecificFields};
use crate::parser::query::Document;

pub struct BasicRegistration;

impl Extractor for BasicRegistration {
    fn extract(&self, doc: &Document) -> Result<TypeSpecificFields, ReportError> {
        // Signature blocks reuse the "Filer" heading; only the contact table
        // has a Name row.
        let t = doc.section("Filer", "Name")?;

        let filer = Filer {
            name: t.required("Name")?,
            organization: t.optional("Organization"),
            address1: t.required("Address")?,
            address2: t.optional("Address 2"),
            city: t.required("City")?,
            state: t.required("State")?,
            postal_code: t.required("Zip")?,
            phone: t.required("Phone")?,
            email: t.required("Email")?,
        };
        Ok(TypeSpecificFields::BasicRegistration { filer })
    }
}
