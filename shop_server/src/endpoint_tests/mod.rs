mod access;
mod admin;
mod cart;
mod checkout;
mod helpers;
mod mocks;
mod orders;
mod webhook;
