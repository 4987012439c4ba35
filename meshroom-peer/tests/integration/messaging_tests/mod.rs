mod test_send_requires_connection;
mod test_three_spokes_fan_out;
