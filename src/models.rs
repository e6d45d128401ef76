use super::schema::invitees;
use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::mysql::{Mysql, MysqlValue};
use diesel::prelude::*;
use diesel::serialize::{self, Output, ToSql};
use diesel::sql_types::Varchar;
use serde::{Deserialize, Serialize};

/// A guest's answer to the invitation. `None` on the guest means no answer yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = Varchar)]
#[serde(rename_all = "lowercase")]
pub enum Attending {
    Yes,
    No,
}

impl Attending {
    pub fn as_str(&self) -> &'static str {
        match self {
            Attending::Yes => "yes",
            Attending::No => "no",
        }
    }
}

impl ToSql<Varchar, Mysql> for Attending {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Mysql>) -> serialize::Result {
        <str as ToSql<Varchar, Mysql>>::to_sql(self.as_str(), out)
    }
}

impl FromSql<Varchar, Mysql> for Attending {
    fn from_sql(value: MysqlValue<'_>) -> deserialize::Result<Self> {
        match <String as FromSql<Varchar, Mysql>>::from_sql(value)?.as_str() {
            "yes" => Ok(Attending::Yes),
            "no" => Ok(Attending::No),
            other => Err(format!("unrecognized attending value `{other}`").into()),
        }
    }
}

/// Column widths of `invitees`, in characters.
pub const ID_MAX_LEN: usize = 64;
pub const NAME_MAX_LEN: usize = 100;
pub const TOKEN_MAX_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Insertable, Selectable, Queryable)]
#[diesel(table_name = invitees)]
pub struct Guest {
    pub id: String,
    #[serde(rename = "fullName")]
    pub full_name: String,
    pub token: String,
    pub attendance_max_count: i32,
    pub attendance_updated_count: i32,
    pub attending: Option<Attending>,
}

impl Guest {
    /// A freshly invited guest who has not answered yet.
    pub fn invite(id: String, full_name: String, token: String, max_count: i32) -> Self {
        Guest {
            id,
            full_name,
            token,
            attendance_max_count: max_count,
            attendance_updated_count: 0,
            attending: None,
        }
    }

    pub fn has_responded(&self) -> bool {
        self.attending.is_some()
    }
}

/// Named fields to merge into an existing guest. `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, AsChangeset)]
#[diesel(table_name = invitees)]
pub struct GuestPatch {
    pub full_name: Option<String>,
    pub token: Option<String>,
    pub attendance_max_count: Option<i32>,
    pub attendance_updated_count: Option<i32>,
    pub attending: Option<Option<Attending>>,
}

impl GuestPatch {
    /// The guest's own answer: attendance state and headcount, nothing else.
    pub fn response(attending: Attending, count: i32) -> Self {
        GuestPatch {
            attendance_updated_count: Some(count),
            attending: Some(Some(attending)),
            ..Default::default()
        }
    }

    /// Organizer edits: everything except the guest's answer.
    pub fn details(full_name: String, token: String, max_count: i32) -> Self {
        GuestPatch {
            full_name: Some(full_name),
            token: Some(token),
            attendance_max_count: Some(max_count),
            ..Default::default()
        }
    }

    pub fn apply(&self, guest: &mut Guest) {
        if let Some(full_name) = &self.full_name {
            guest.full_name = full_name.clone();
        }
        if let Some(token) = &self.token {
            guest.token = token.clone();
        }
        if let Some(max) = self.attendance_max_count {
            guest.attendance_max_count = max;
        }
        if let Some(count) = self.attendance_updated_count {
            guest.attendance_updated_count = count;
        }
        if let Some(attending) = self.attending {
            guest.attending = attending;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_patch_leaves_details_untouched() {
        let mut guest = Guest::invite("g1".into(), "Ada".into(), "AB12".into(), 3);
        GuestPatch::response(Attending::Yes, 2).apply(&mut guest);

        assert_eq!(guest.attending, Some(Attending::Yes));
        assert_eq!(guest.attendance_updated_count, 2);
        assert_eq!(guest.full_name, "Ada");
        assert_eq!(guest.token, "AB12");
        assert_eq!(guest.attendance_max_count, 3);
    }

    #[test]
    fn details_patch_keeps_the_answer() {
        let mut guest = Guest::invite("g1".into(), "Ada".into(), "AB12".into(), 3);
        guest.attending = Some(Attending::Yes);
        guest.attendance_updated_count = 2;

        GuestPatch::details("Ada L.".into(), "ZZ99".into(), 4).apply(&mut guest);

        assert_eq!(guest.full_name, "Ada L.");
        assert_eq!(guest.token, "ZZ99");
        assert_eq!(guest.attendance_max_count, 4);
        assert_eq!(guest.attending, Some(Attending::Yes));
        assert_eq!(guest.attendance_updated_count, 2);
    }
}
