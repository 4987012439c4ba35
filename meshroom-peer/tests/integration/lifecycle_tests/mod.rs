mod test_hub_reset_notifies_spokes;
mod test_hung_open;
mod test_reset_room;
mod test_shutdown;
