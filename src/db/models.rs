//! Record and patch declarations for the three backed tables.

use crate::{patch, record};

record! {
    pub struct User("users") {
        pub uid: i64 => "uid",
        pub name: String => "name",
        pub admin: bool => "admin",
        /// Argon2id hash; never serialized into responses.
        #[serde(skip_serializing)]
        pub password: String => "password",
    }
}

record! {
    pub struct Post("posts") {
        pub pid: i64 => "pid",
        pub date: String => "date",
        pub content: String => "content",
    }
}

record! {
    pub struct Comment("comments") {
        pub cid: i64 => "cid",
        pub pid: i64 => "pid",
        pub uid: i64 => "uid",
        pub text: String => "text",
        #[serde(skip_serializing_if = "Option::is_none")]
        pub answer: Option<String> => "answer",
    }
}

patch! {
    pub struct UserPatch {
        pub admin: bool => "admin",
        pub password: String => "password",
    }
}

patch! {
    pub struct PostPatch {
        pub content: String => "content",
    }
}

patch! {
    pub struct CommentPatch {
        pub answer: String => "answer",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::record::Record as _;

    #[test]
    fn declared_columns_match_the_schema() {
        assert_eq!(User::TABLE, "users");
        assert_eq!(User::COLUMNS, &["uid", "name", "admin", "password"]);
        assert_eq!(Post::COLUMNS, &["pid", "date", "content"]);
        assert_eq!(Comment::COLUMNS, &["cid", "pid", "uid", "text", "answer"]);
    }

    #[test]
    fn password_never_serializes() {
        let user = User {
            uid: 1,
            name: "admin".to_string(),
            admin: true,
            password: "$argon2id$secret".to_string(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2id"));
        assert!(!json.contains("password"));
    }

    #[test]
    fn unanswered_comment_omits_answer() {
        let comment = Comment {
            cid: 1,
            pid: 1,
            uid: 2,
            text: "hello".to_string(),
            answer: None,
        };
        let json = serde_json::to_value(&comment).unwrap();
        assert!(json.get("answer").is_none());
    }
}
