mod call_sites;
mod decision;
mod enums;
mod pass;
mod wrappers;
