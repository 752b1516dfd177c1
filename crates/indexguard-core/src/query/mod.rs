pub mod check_level;
pub mod checked;
pub mod containers;
pub mod guards;
pub mod out_of_date;
pub mod unchecked;
