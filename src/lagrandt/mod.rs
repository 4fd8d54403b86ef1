pub mod equivalences;
