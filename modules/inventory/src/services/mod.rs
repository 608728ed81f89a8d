pub mod movement_service;
