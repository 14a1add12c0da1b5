mod helpers;
mod inventory;
mod merchant;
mod mocks;
mod orders;
