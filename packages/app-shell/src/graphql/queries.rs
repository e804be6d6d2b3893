//! GraphQL query definitions
//!
//! Each definition is shared by every component that preloads or reads it.

use suspense::QueryDefinition;

/// Current user, read by the app root and propagated into the app context.
pub const USER_QUERY: QueryDefinition = QueryDefinition::new(
    "AppUserQuery",
    r#"
  query AppUserQuery {
    me {
      id
      email
      name
      photoURL
    }
  }
"#,
);

/// Fields the header's right-hand widget displays.
pub const HEADER_RIGHT_WIDGET_USER_FRAGMENT: &str = r#"
  fragment HeaderRightWidget_user on User {
    id
    name
    photoURL
  }
"#;

/// Header data, fetched independently of [`USER_QUERY`].
pub const HEADER_QUERY: QueryDefinition = QueryDefinition::new(
    "Header_Query",
    r#"
  query Header_Query {
    me {
      ...HeaderRightWidget_user
    }
  }

  fragment HeaderRightWidget_user on User {
    id
    name
    photoURL
  }
"#,
);
