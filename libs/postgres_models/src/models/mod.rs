pub mod sensor_readings;
