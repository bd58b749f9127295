pub mod record;
pub mod update;
pub mod user;

pub use record::{InterestedSection, TakenCourse};
pub use update::{
    CoursesTakenUpdate, FriendRequestsUpdate, FriendsUpdate, InterestedSectionsUpdate,
    PersonalUpdate, UpdateRequest,
};
pub use user::{
    FriendIndex, FriendProfile, Preferences, ScoreWeighting, SectionTimeRange, UserInfo,
    UserSnapshot,
};
