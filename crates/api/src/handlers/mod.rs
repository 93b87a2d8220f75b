pub mod imports;
pub mod team_members;
