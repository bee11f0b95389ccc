// The directory core: every component that mutates aggregate state lives
// here, wired together into one cloneable façade for the HTTP layer.

pub mod announcements;
pub mod fanout;
pub mod follow;
pub mod notifications;
pub mod programs;
pub mod rating;
pub mod reviews;
pub mod schools;
pub mod semesters;
pub mod sequence;
pub mod users;

use std::sync::Arc;

use crate::config::AdminCodes;
use crate::store::DirectoryStore;

pub use fanout::{FanoutReport, NotificationFanout, NotificationSink};
pub use sequence::SequenceAllocator;

#[derive(Clone)]
pub struct Directory {
    pub users: users::UserRegistry,
    pub schools: schools::SchoolDirectory,
    pub reviews: reviews::Reviews,
    pub programs: programs::Programs,
    pub semesters: semesters::Semesters,
    pub announcements: announcements::Announcements,
    pub follows: follow::FollowGraph,
    pub inbox: notifications::Inbox,
}

impl Directory {
    pub fn new(store: Arc<DirectoryStore>, admin_codes: AdminCodes) -> Self {
        Directory {
            users: users::UserRegistry::new(store.clone(), admin_codes),
            schools: schools::SchoolDirectory::new(store.clone()),
            reviews: reviews::Reviews::new(store.clone()),
            programs: programs::Programs::new(store.clone()),
            semesters: semesters::Semesters::new(store.clone()),
            announcements: announcements::Announcements::new(store.clone()),
            follows: follow::FollowGraph::new(store.clone()),
            inbox: notifications::Inbox::new(store),
        }
    }
}
