mod helpers;
mod mocks;

mod acl;
mod orders;
mod ratings;
