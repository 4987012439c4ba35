mod test_dial_closed_before_open;
mod test_invited_spoke_rejects_inbound;
mod test_join_guards;
