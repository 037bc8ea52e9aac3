use datapipe::{Entity, Record, SqlValue};
use serde::Serialize;
use std::borrow::Cow;

#[derive(Clone, Debug, Default, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub nickname: String,
    pub email: String,
    pub sex: i32,
}

impl Record for User {
    fn values(&self) -> Vec<(Cow<'_, str>, SqlValue)> {
        vec![
            ("id".into(), self.id.into()),
            ("nickname".into(), (&self.nickname).into()),
            ("email".into(), (&self.email).into()),
            ("sex".into(), self.sex.into()),
        ]
    }
}

impl Entity for User {
    type Key = i64;

    fn table_name() -> &'static str {
        "users"
    }

    fn columns() -> &'static [&'static str] {
        &["id", "nickname", "email", "sex"]
    }

    fn key(&self) -> i64 {
        self.id
    }
}
