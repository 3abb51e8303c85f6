//! HTTP JSON API endpoints.
//!
//! | Endpoint | Method | Description |
//! |----------|--------|-------------|
//! | `/auth/register` | POST | Register and start a session |
//! | `/auth/login` | POST | Log in by username or email |
//! | `/auth/logout` | POST | End the session |
//! | `/auth/check` | GET | Whether the caller is logged in |
//! | `/auth/profile` | GET | Caller's profile |
//! | `/sets` | POST | Create set |
//! | `/sets` | GET | List sets |
//! | `/sets/my-sets` | GET | Caller's sets with card counts |
//! | `/sets/search` | GET | Public title search |
//! | `/sets/{set_id}` | GET/PUT/DELETE | Get, update, delete set |
//! | `/cards/set/{set_id}` | POST/GET | Create card, list cards |
//! | `/cards/{card_id}` | GET/PUT/DELETE | Get, update, delete card |

pub mod error;
pub mod routes;
pub mod session;
pub mod state;

pub use error::{error_codes, ApiError, JsonBadRequest, QueryBadRequest};
pub use routes::{
    create_router, create_router_with_body_limit, create_router_with_observability,
    DEFAULT_BODY_LIMIT,
};
pub use session::{Caller, SessionKey};
pub use state::AppState;
